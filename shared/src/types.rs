//! Common types used across the canteen

use rust_decimal::Decimal;
use thiserror::Error;

/// Convert integer minor units into a two-decimal euro amount.
///
/// Money is kept in cents everywhere; this is for display boundaries only.
pub fn cents_to_eur(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Human readable euro amount, e.g. `-5.40 €`
pub fn format_eur(cents: i64) -> String {
    format!("{} €", cents_to_eur(cents))
}

/// Integer division rounded half away from zero.
///
/// `divisor` must be positive.
pub fn div_round(numerator: i64, divisor: i64) -> i64 {
    debug_assert!(divisor > 0);
    let (numerator, divisor) = (i128::from(numerator), i128::from(divisor));
    let half = divisor / 2;
    let rounded = if numerator >= 0 {
        (numerator + half) / divisor
    } else {
        (numerator - half) / divisor
    };
    // |rounded| never exceeds |numerator|
    rounded as i64
}

/// Stock or money arithmetic left the range the ledger can represent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Amount is outside the supported range")]
pub struct Overflow;

/// Sum `values`, failing instead of wrapping
pub fn checked_sum<I: IntoIterator<Item = i64>>(values: I) -> Result<i64, Overflow> {
    values
        .into_iter()
        .try_fold(0i64, |acc, v| acc.checked_add(v))
        .ok_or(Overflow)
}

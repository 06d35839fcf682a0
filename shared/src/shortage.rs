//! Shortage attribution
//!
//! Losses found by reconciliation are shared by the community. Each user has
//! a personal cutoff: shortages recorded before they joined, or before they
//! last acknowledged a warning, are not shown to them again. Write-offs are
//! sanctioned removals and never count as shortage.

use chrono::{DateTime, Utc};

use crate::models::{ShortageEvent, ShortageLineItem, ShortageSummary, ShortageWarning};
use crate::types::cents_to_eur;

/// The later of account creation and the last acknowledgement
pub fn warning_cutoff(
    user_created_at: DateTime<Utc>,
    acknowledged_at: Option<DateTime<Utc>>,
) -> DateTime<Utc> {
    match acknowledged_at {
        Some(ack) if ack > user_created_at => ack,
        _ => user_created_at,
    }
}

pub fn counts_as_shortage(event: &ShortageEvent) -> bool {
    event.difference < 0 && !event.is_write_off
}

fn units_lost(event: &ShortageEvent) -> i64 {
    event.difference.abs()
}

/// Build the warning a user sees for shortages strictly after `cutoff`.
///
/// `shortage_since` is the user's last acknowledgement time, echoed back.
pub fn build_warning(
    events: &[ShortageEvent],
    cutoff: DateTime<Utc>,
    shortage_since: Option<DateTime<Utc>>,
) -> ShortageWarning {
    let mut relevant: Vec<&ShortageEvent> = events
        .iter()
        .filter(|e| counts_as_shortage(e) && e.created_at > cutoff)
        .collect();
    relevant.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let line_items: Vec<ShortageLineItem> = relevant
        .iter()
        .map(|e| {
            let quantity_lost = units_lost(e);
            let value_cents = quantity_lost * e.unit_price_cents;
            ShortageLineItem {
                product_name: e.product_name.clone(),
                difference: e.difference,
                quantity_lost,
                value_cents,
                value_eur: cents_to_eur(value_cents),
                created_at: e.created_at,
            }
        })
        .collect();

    let total_shortage_units: i64 = line_items.iter().map(|l| l.quantity_lost).sum();
    let total_value_cents: i64 = line_items.iter().map(|l| l.value_cents).sum();
    let has_warning = total_shortage_units > 0;

    ShortageWarning {
        has_warning,
        total_shortage_units,
        total_value_cents,
        total_value_eur: cents_to_eur(total_value_cents),
        shortage_since,
        line_items: if has_warning { line_items } else { Vec::new() },
    }
}

/// Lifetime units lost across every product, write-offs included.
///
/// This is the figure stored with an acknowledgement; it is not the
/// shortage a user is warned about.
pub fn lifetime_units_lost(events: &[ShortageEvent]) -> i64 {
    events.iter().filter(|e| e.difference < 0).map(units_lost).sum()
}

/// Lifetime shortage value across every product at current regular prices
pub fn global_shortage_cents(events: &[ShortageEvent]) -> i64 {
    events
        .iter()
        .filter(|e| counts_as_shortage(e))
        .map(|e| units_lost(e) * e.unit_price_cents)
        .sum()
}

/// Global shortage net of everything users have contributed towards it
pub fn summarize(total_shortage_cents: i64, total_contributions_cents: i64) -> ShortageSummary {
    let remaining_shortage_cents = total_shortage_cents - total_contributions_cents;
    ShortageSummary {
        total_shortage_cents,
        total_shortage_eur: cents_to_eur(total_shortage_cents),
        total_contributions_cents,
        total_contributions_eur: cents_to_eur(total_contributions_cents),
        remaining_shortage_cents,
        remaining_shortage_eur: cents_to_eur(remaining_shortage_cents),
    }
}

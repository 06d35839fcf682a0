//! Account ledger folds
//!
//! Balances are never stored; they are always the sum of a user's entries.

use thiserror::Error;

use crate::models::{AccountEntry, HistoryEntry};
use crate::types::cents_to_eur;

/// Description used when staff record a deposit without a note
pub const DEFAULT_DEPOSIT_DESCRIPTION: &str = "Deposit / debt settlement";

pub fn balance(entries: &[AccountEntry]) -> i64 {
    entries.iter().map(|e| e.amount_cents).sum()
}

/// Attach the running balance to each entry.
///
/// `entries` may come in any order; the result is newest first and each
/// running balance is the balance right after that entry. Entries with equal
/// timestamps keep their relative input order.
pub fn running_history(entries: &[AccountEntry]) -> Vec<HistoryEntry> {
    let mut ordered: Vec<&AccountEntry> = entries.iter().collect();
    ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    let mut running = 0i64;
    let mut history: Vec<HistoryEntry> = ordered
        .into_iter()
        .map(|entry| {
            running += entry.amount_cents;
            HistoryEntry {
                entry: entry.clone(),
                running_balance_cents: running,
                running_balance_eur: cents_to_eur(running),
            }
        })
        .collect();

    history.reverse();
    history
}

pub fn purchase_description(quantity: i64, product_name: &str) -> String {
    format!("Purchase: {}x {}", quantity, product_name)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DepositError {
    #[error("Deposit amount must be positive")]
    NonPositiveAmount,

    #[error("Contribution cannot be negative")]
    NegativeContribution,

    #[error("Contribution {contribution} exceeds the deposited amount {amount}")]
    ContributionExceedsAmount { amount: i64, contribution: i64 },
}

/// How a staff-recorded deposit is booked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositSplit {
    /// Credited to the user's own ledger
    pub account_cents: i64,
    /// Recorded as a shortage contribution, outside the ledger
    pub contribution_cents: i64,
}

pub fn split_deposit(amount_cents: i64, contribution_cents: i64) -> Result<DepositSplit, DepositError> {
    if amount_cents <= 0 {
        return Err(DepositError::NonPositiveAmount);
    }
    if contribution_cents < 0 {
        return Err(DepositError::NegativeContribution);
    }
    if contribution_cents > amount_cents {
        return Err(DepositError::ContributionExceedsAmount {
            amount: amount_cents,
            contribution: contribution_cents,
        });
    }

    Ok(DepositSplit {
        account_cents: amount_cents - contribution_cents,
        contribution_cents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use uuid::Uuid;

    fn entry(amount_cents: i64, created_at: DateTime<Utc>) -> AccountEntry {
        AccountEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            amount_cents,
            description: None,
            created_at,
        }
    }

    #[test]
    fn test_balance_is_sum() {
        let now = Utc::now();
        assert_eq!(balance(&[]), 0);
        assert_eq!(balance(&[entry(1000, now), entry(-740, now), entry(-60, now)]), 200);
    }

    #[test]
    fn test_running_history_newest_first() {
        let t0 = Utc::now();
        let entries = [
            entry(-740, t0 + Duration::minutes(1)),
            entry(1000, t0),
            entry(-60, t0 + Duration::minutes(2)),
        ];
        let history = running_history(&entries);

        let running: Vec<i64> = history.iter().map(|h| h.running_balance_cents).collect();
        assert_eq!(running, vec![200, 260, 1000]);
        assert_eq!(history[0].entry.amount_cents, -60);
        assert_eq!(history[0].running_balance_cents, balance(&entries));
    }

    #[test]
    fn test_purchase_description() {
        assert_eq!(purchase_description(7, "Horalky"), "Purchase: 7x Horalky");
    }

    #[test]
    fn test_split_deposit() {
        assert_eq!(
            split_deposit(1000, 200),
            Ok(DepositSplit {
                account_cents: 800,
                contribution_cents: 200
            })
        );
        assert_eq!(split_deposit(500, 500).map(|s| s.account_cents), Ok(0));
        assert_eq!(split_deposit(0, 0), Err(DepositError::NonPositiveAmount));
        assert_eq!(split_deposit(100, -1), Err(DepositError::NegativeContribution));
        assert_eq!(
            split_deposit(100, 101),
            Err(DepositError::ContributionExceedsAmount {
                amount: 100,
                contribution: 101
            })
        );
    }
}

//! Account ledger models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserRole;

/// One immutable signed ledger line.
///
/// Negative amounts are purchases, positive amounts are deposits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A ledger line together with the balance right after it was booked
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub entry: AccountEntry,
    pub running_balance_cents: i64,
    pub running_balance_eur: Decimal,
}

/// Derived balance of one user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountBalance {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub balance_cents: i64,
    pub balance_eur: Decimal,
}

/// A voluntary payment towards the collective shortage.
///
/// Kept apart from the ledger: it never changes the payer's balance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShortageContribution {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub description: Option<String>,
    pub recorded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

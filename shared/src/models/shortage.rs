//! Shortage attribution models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's "seen up to" watermark for shortage warnings (one row per user)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShortageAcknowledgement {
    pub user_id: Uuid,
    pub acknowledged_at: DateTime<Utc>,
    /// Units lost across all products (write-offs included) when acknowledged
    pub shortage_total: i64,
}

/// One reconciliation record as seen by shortage attribution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShortageEvent {
    pub adjustment_id: Uuid,
    pub product_name: String,
    pub difference: i64,
    /// Current regular price of the product
    pub unit_price_cents: i64,
    pub is_write_off: bool,
    pub created_at: DateTime<Utc>,
}

/// One lost product in a user's warning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShortageLineItem {
    pub product_name: String,
    pub difference: i64,
    pub quantity_lost: i64,
    pub value_cents: i64,
    pub value_eur: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Shortage warning shown to a user after login
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShortageWarning {
    pub has_warning: bool,
    pub total_shortage_units: i64,
    pub total_value_cents: i64,
    pub total_value_eur: Decimal,
    /// Last acknowledgement, if any
    pub shortage_since: Option<DateTime<Utc>>,
    pub line_items: Vec<ShortageLineItem>,
}

/// Global shortage balance for staff
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShortageSummary {
    pub total_shortage_cents: i64,
    pub total_shortage_eur: Decimal,
    pub total_contributions_cents: i64,
    pub total_contributions_eur: Decimal,
    pub remaining_shortage_cents: i64,
    pub remaining_shortage_eur: Decimal,
}

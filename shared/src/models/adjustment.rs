//! Inventory reconciliation records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable audit record of one physical stock count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockAdjustment {
    pub id: Uuid,
    pub product_id: Uuid,
    /// Sum of batch quantities immediately before the count
    pub expected_quantity: i64,
    pub actual_quantity: i64,
    /// `actual_quantity - expected_quantity`
    pub difference: i64,
    pub reason: Option<String>,
    pub created_by: Option<Uuid>,
    pub is_write_off: bool,
    pub created_at: DateTime<Utc>,
}

/// Adjustment joined with its product, for the staff history listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAdjustmentWithProduct {
    #[serde(flatten)]
    pub adjustment: StockAdjustment,
    pub product_name: String,
    pub product_ean: String,
}

/// How a reconciliation discrepancy reads to staff.
///
/// Computed at response time only; never stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "units", rename_all = "snake_case")]
pub enum AdjustmentOutcome {
    WrittenOff(i64),
    Shortage(i64),
    Surplus(i64),
    Matches,
}

impl AdjustmentOutcome {
    pub fn classify(difference: i64, is_write_off: bool) -> Self {
        if is_write_off && difference < 0 {
            AdjustmentOutcome::WrittenOff(difference.abs())
        } else if difference < 0 {
            AdjustmentOutcome::Shortage(difference.abs())
        } else if difference > 0 {
            AdjustmentOutcome::Surplus(difference)
        } else {
            AdjustmentOutcome::Matches
        }
    }

    pub fn message(&self) -> String {
        match self {
            AdjustmentOutcome::WrittenOff(units) => format!("Written off: {} pcs", units),
            AdjustmentOutcome::Shortage(units) => format!("Shortage recorded: {} pcs", units),
            AdjustmentOutcome::Surplus(units) => format!("Surplus recorded: {} pcs", units),
            AdjustmentOutcome::Matches => "Stock matches, no action needed".to_string(),
        }
    }

    pub fn message_sk(&self) -> String {
        match self {
            AdjustmentOutcome::WrittenOff(units) => format!("Odpísané zo skladu: {} ks", units),
            AdjustmentOutcome::Shortage(units) => format!("Zaznamenané manko: {} ks", units),
            AdjustmentOutcome::Surplus(units) => format!("Zaznamenaný prebytok: {} ks", units),
            AdjustmentOutcome::Matches => "Stav skladu súhlasí".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(AdjustmentOutcome::classify(-10, true), AdjustmentOutcome::WrittenOff(10));
        assert_eq!(AdjustmentOutcome::classify(-3, false), AdjustmentOutcome::Shortage(3));
        assert_eq!(AdjustmentOutcome::classify(4, false), AdjustmentOutcome::Surplus(4));
        assert_eq!(AdjustmentOutcome::classify(0, false), AdjustmentOutcome::Matches);
    }

    #[test]
    fn test_write_off_flag_ignored_without_loss() {
        // A write-off that turns out to be a surplus is still a surplus
        assert_eq!(AdjustmentOutcome::classify(2, true), AdjustmentOutcome::Surplus(2));
        assert_eq!(AdjustmentOutcome::classify(0, true), AdjustmentOutcome::Matches);
    }

    #[test]
    fn test_messages() {
        assert_eq!(AdjustmentOutcome::Shortage(3).message(), "Shortage recorded: 3 pcs");
        assert_eq!(AdjustmentOutcome::Matches.message_sk(), "Stav skladu súhlasí");
    }
}

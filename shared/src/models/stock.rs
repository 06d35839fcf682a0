//! Stock batch models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{checked_sum, Overflow};

/// A quantity of one product bought at one unit cost at one point in time.
///
/// `quantity` only ever goes down (purchases) except when a reconciliation
/// replaces the product's batches wholesale. `price_cents` never changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockBatch {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub price_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// A non-empty batch as seen by the pricing engine, oldest first
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchLayer {
    pub batch_id: Uuid,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

impl From<&StockBatch> for BatchLayer {
    fn from(batch: &StockBatch) -> Self {
        Self {
            batch_id: batch.id,
            quantity: batch.quantity,
            unit_cost_cents: batch.price_cents,
        }
    }
}

/// Sum of the quantities of all non-empty layers
pub fn total_quantity(layers: &[BatchLayer]) -> Result<i64, Overflow> {
    checked_sum(layers.iter().filter(|l| l.quantity > 0).map(|l| l.quantity))
}

/// Stock batch joined with its product, for the staff stock listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockBatchWithProduct {
    #[serde(flatten)]
    pub batch: StockBatch,
    pub product_name: String,
    pub product_ean: String,
}

//! Inventory reconciliation planning
//!
//! A physical count replaces whatever the batch model believed: every batch
//! of the product is dropped and, when anything is left on the shelf, a
//! single batch at the weighted average cost takes their place.

use crate::models::{total_quantity, AdjustmentOutcome, BatchLayer};
use crate::types::Overflow;

/// The single batch that survives a reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplacementBatch {
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

/// Everything a reconciliation writes, decided up front
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub expected_quantity: i64,
    pub actual_quantity: i64,
    pub difference: i64,
    pub unit_cost_cents: i64,
    pub is_write_off: bool,
    /// `None` when the shelf is empty
    pub replacement: Option<ReplacementBatch>,
}

impl ReconciliationPlan {
    pub fn outcome(&self) -> AdjustmentOutcome {
        AdjustmentOutcome::classify(self.difference, self.is_write_off)
    }
}

/// Quantity-weighted average unit cost over the non-empty layers.
///
/// Falls back to `fallback_price_cents` (the product's regular price) when
/// there is nothing in stock. The stock value is accumulated in `i128` and
/// rounded half away from zero.
pub fn weighted_average_cost(layers: &[BatchLayer], fallback_price_cents: i64) -> Result<i64, Overflow> {
    let quantity = i128::from(total_quantity(layers)?);
    if quantity == 0 {
        return Ok(fallback_price_cents);
    }

    let value = layers
        .iter()
        .filter(|l| l.quantity > 0)
        .try_fold(0i128, |acc, l| {
            acc.checked_add(i128::from(l.quantity) * i128::from(l.unit_cost_cents))
        })
        .ok_or(Overflow)?;

    let half = quantity / 2;
    let rounded = if value >= 0 {
        value.checked_add(half)
    } else {
        value.checked_sub(half)
    }
    .ok_or(Overflow)?;

    i64::try_from(rounded / quantity).map_err(|_| Overflow)
}

/// Plan a reconciliation of `layers` against a counted `actual_quantity`.
///
/// `actual_quantity` must already be validated as non-negative.
pub fn plan(
    layers: &[BatchLayer],
    actual_quantity: i64,
    fallback_price_cents: i64,
    is_write_off: bool,
) -> Result<ReconciliationPlan, Overflow> {
    let expected_quantity = total_quantity(layers)?;
    let unit_cost_cents = weighted_average_cost(layers, fallback_price_cents)?;

    let replacement = (actual_quantity > 0).then_some(ReplacementBatch {
        quantity: actual_quantity,
        unit_cost_cents,
    });

    Ok(ReconciliationPlan {
        expected_quantity,
        actual_quantity,
        difference: actual_quantity - expected_quantity,
        unit_cost_cents,
        is_write_off,
        replacement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn layer(quantity: i64, unit_cost_cents: i64) -> BatchLayer {
        BatchLayer {
            batch_id: Uuid::new_v4(),
            quantity,
            unit_cost_cents,
        }
    }

    #[test]
    fn test_weighted_average() {
        // (10*100 + 30*120) / 40 = 115
        assert_eq!(weighted_average_cost(&[layer(10, 100), layer(30, 120)], 60), Ok(115));
        // (1*100 + 2*101) / 3 = 100.67
        assert_eq!(weighted_average_cost(&[layer(1, 100), layer(2, 101)], 60), Ok(101));
    }

    #[test]
    fn test_weighted_average_ignores_empty_layers() {
        assert_eq!(weighted_average_cost(&[layer(0, 999), layer(4, 80)], 60), Ok(80));
    }

    #[test]
    fn test_weighted_average_falls_back_to_price() {
        assert_eq!(weighted_average_cost(&[], 60), Ok(60));
        assert_eq!(weighted_average_cost(&[layer(0, 80)], 60), Ok(60));
    }

    #[test]
    fn test_collapse_to_single_batch() {
        let layers = [layer(10, 100), layer(20, 110), layer(20, 130)];
        let plan = plan(&layers, 40, 60, false).unwrap();

        assert_eq!(plan.expected_quantity, 50);
        assert_eq!(plan.difference, -10);
        assert_eq!(
            plan.replacement,
            Some(ReplacementBatch {
                quantity: 40,
                unit_cost_cents: 116
            })
        );
        assert_eq!(plan.outcome(), AdjustmentOutcome::Shortage(10));
    }

    #[test]
    fn test_empty_shelf_leaves_no_batch() {
        let plan = plan(&[layer(5, 100)], 0, 60, true).unwrap();
        assert_eq!(plan.replacement, None);
        assert_eq!(plan.difference, -5);
        assert_eq!(plan.outcome(), AdjustmentOutcome::WrittenOff(5));
    }

    #[test]
    fn test_surplus_on_empty_stock_uses_regular_price() {
        let plan = plan(&[], 3, 60, false).unwrap();
        assert_eq!(plan.expected_quantity, 0);
        assert_eq!(plan.difference, 3);
        assert_eq!(plan.unit_cost_cents, 60);
        assert_eq!(plan.outcome(), AdjustmentOutcome::Surplus(3));
    }

    #[test]
    fn test_large_stock_value_does_not_wrap() {
        // 10^10 units at 10^10 cents is worth 10^20 cents, beyond i64
        let big = 10_000_000_000;
        assert_eq!(weighted_average_cost(&[layer(big, big)], 100), Ok(big));
        assert_eq!(
            weighted_average_cost(&[layer(big, big), layer(big, big - 2)], 100),
            Ok(big - 1)
        );
    }

    #[test]
    fn test_unrepresentable_stock_is_an_error() {
        let huge = i64::MAX / 2 + 1;
        assert_eq!(weighted_average_cost(&[layer(huge, 1), layer(huge, 1)], 100), Err(Overflow));
        assert_eq!(plan(&[layer(huge, 1), layer(huge, 1)], 0, 100, false), Err(Overflow));
    }
}

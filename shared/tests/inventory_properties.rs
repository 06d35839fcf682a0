//! Inventory costing tests
//!
//! Property-based and scenario tests for:
//! - FIFO allocation order and cost
//! - No oversell
//! - Sale price override
//! - Reconciliation batch collapse

use chrono::{Duration, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use shared::models::{total_quantity, AdjustmentOutcome, BatchLayer, Product};
use shared::pricing::{allocate_fifo, plan_purchase, quote, PricingError};
use shared::reconciliation;

// ============================================================================
// Property Test Strategies
// ============================================================================

fn layer_strategy() -> impl Strategy<Value = BatchLayer> {
    (0i64..50, 1i64..500).prop_map(|(quantity, unit_cost_cents)| BatchLayer {
        batch_id: Uuid::new_v4(),
        quantity,
        unit_cost_cents,
    })
}

fn layers_strategy() -> impl Strategy<Value = Vec<BatchLayer>> {
    prop::collection::vec(layer_strategy(), 0..8)
}

fn product(sale_price_cents: Option<i64>, sale_active: bool) -> Product {
    let now = Utc::now();
    let expires = if sale_active {
        now + Duration::days(3)
    } else {
        now - Duration::days(3)
    };
    Product {
        id: Uuid::new_v4(),
        name: "Snickers".to_string(),
        ean: "5000159461122".to_string(),
        price_cents: 100,
        sale_price_cents,
        sale_expires_at: sale_price_cents.map(|_| expires),
        created_at: now - Duration::days(30),
    }
}

// ============================================================================
// Scenario Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    fn layer(quantity: i64, unit_cost_cents: i64) -> BatchLayer {
        BatchLayer {
            batch_id: Uuid::new_v4(),
            quantity,
            unit_cost_cents,
        }
    }

    /// Batch A (5 @ 100) then batch B (5 @ 120); buying 7 costs 740
    #[test]
    fn test_purchase_of_seven_across_two_batches() {
        let a = layer(5, 100);
        let b = layer(5, 120);
        let plan = plan_purchase(&product(None, false), &[a, b], 7, Utc::now()).unwrap();

        assert_eq!(plan.total_cents, 740);
        assert_eq!(plan.allocations.len(), 2);
        assert_eq!((plan.allocations[0].batch_id, plan.allocations[0].quantity), (a.batch_id, 5));
        assert_eq!((plan.allocations[1].batch_id, plan.allocations[1].quantity), (b.batch_id, 2));

        // What remains on each batch afterwards
        assert_eq!(a.quantity - plan.allocations[0].quantity, 0);
        assert_eq!(b.quantity - plan.allocations[1].quantity, 3);
    }

    #[test]
    fn test_sale_of_three_costs_150() {
        let layers = [layer(2, 80), layer(4, 90)];
        let now = Utc::now();

        let on_sale = product(Some(50), true);
        assert_eq!(plan_purchase(&on_sale, &layers, 3, now).unwrap().total_cents, 150);

        let expired = product(Some(50), false);
        assert_eq!(plan_purchase(&expired, &layers, 3, now).unwrap().total_cents, 2 * 80 + 90);
    }

    #[test]
    fn test_reconcile_three_batches_to_forty() {
        let layers = [layer(10, 100), layer(15, 110), layer(25, 120)];
        let plan = reconciliation::plan(&layers, 40, 100, false).unwrap();

        assert_eq!(plan.expected_quantity, 50);
        assert_eq!(plan.difference, -10);
        let replacement = plan.replacement.unwrap();
        assert_eq!(replacement.quantity, 40);
        assert_eq!(plan.outcome(), AdjustmentOutcome::Shortage(10));

        let emptied = reconciliation::plan(&layers, 0, 100, false).unwrap();
        assert!(emptied.replacement.is_none());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Allocations always sum to the requested quantity and never exceed a batch
        #[test]
        fn prop_allocation_conserves_stock(layers in layers_strategy(), quantity in 1i64..200) {
            let available = total_quantity(&layers).unwrap();
            match allocate_fifo(&layers, quantity) {
                Ok(allocations) => {
                    prop_assert!(quantity <= available);
                    let allocated: i64 = allocations.iter().map(|a| a.quantity).sum();
                    prop_assert_eq!(allocated, quantity);
                    for allocation in &allocations {
                        let batch = layers.iter().find(|l| l.batch_id == allocation.batch_id).unwrap();
                        prop_assert!(allocation.quantity > 0);
                        prop_assert!(allocation.quantity <= batch.quantity);
                    }
                }
                Err(PricingError::InsufficientStock { available: a, requested }) => {
                    prop_assert_eq!(a, available);
                    prop_assert_eq!(requested, quantity);
                    prop_assert!(quantity > available);
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }

        /// Every batch before the last one touched is fully exhausted
        #[test]
        fn prop_fifo_exhausts_older_batches_first(layers in layers_strategy(), quantity in 1i64..200) {
            if let Ok(allocations) = allocate_fifo(&layers, quantity) {
                let non_empty: Vec<&BatchLayer> = layers.iter().filter(|l| l.quantity > 0).collect();
                prop_assert!(allocations.len() <= non_empty.len());
                for (i, allocation) in allocations.iter().enumerate() {
                    prop_assert_eq!(allocation.batch_id, non_empty[i].batch_id);
                    prop_assert_eq!(allocation.price_cents, non_empty[i].unit_cost_cents);
                    if i + 1 < allocations.len() {
                        prop_assert_eq!(allocation.quantity, non_empty[i].quantity);
                    }
                }
            }
        }

        /// Buying one more than the oldest batch holds costs q1*c1 + c2
        #[test]
        fn prop_oldest_plus_one(
            q1 in 1i64..50, c1 in 1i64..500,
            q2 in 1i64..50, c2 in 1i64..500,
            q3 in 1i64..50, c3 in 1i64..500,
        ) {
            let layers = [
                BatchLayer { batch_id: Uuid::new_v4(), quantity: q1, unit_cost_cents: c1 },
                BatchLayer { batch_id: Uuid::new_v4(), quantity: q2, unit_cost_cents: c2 },
                BatchLayer { batch_id: Uuid::new_v4(), quantity: q3, unit_cost_cents: c3 },
            ];
            let plan = plan_purchase(&product(None, false), &layers, q1 + 1, Utc::now()).unwrap();
            prop_assert_eq!(plan.total_cents, q1 * c1 + c2);
        }

        /// An active sale prices every unit the same regardless of batch costs
        #[test]
        fn prop_sale_price_overrides(layers in layers_strategy(), sale in 1i64..300, quantity in 1i64..50) {
            let now = Utc::now();
            let on_sale = product(Some(sale), true);
            if let Ok(plan) = plan_purchase(&on_sale, &layers, quantity, now) {
                prop_assert!(plan.is_sale);
                prop_assert_eq!(plan.total_cents, sale * quantity);
                let q = quote(&on_sale, &layers, quantity, now).unwrap();
                prop_assert_eq!(q.total_cents, plan.total_cents);
            }
        }

        /// Quote and purchase agree on the exact total in FIFO mode
        #[test]
        fn prop_quote_matches_purchase(layers in layers_strategy(), quantity in 1i64..100) {
            let now = Utc::now();
            let regular = product(None, false);
            match (quote(&regular, &layers, quantity, now), plan_purchase(&regular, &layers, quantity, now)) {
                (Ok(q), Ok(plan)) => {
                    prop_assert_eq!(q.total_cents, plan.total_cents);
                    let breakdown_total: i64 = q.breakdown.iter().map(|b| b.quantity * b.price_cents).sum();
                    prop_assert_eq!(breakdown_total, q.total_cents);
                }
                (Err(PricingError::NoStock), Err(PricingError::InsufficientStock { available, .. })) => {
                    prop_assert_eq!(available, 0);
                }
                (Err(a), Err(b)) => prop_assert_eq!(a, b),
                (q, p) => prop_assert!(false, "quote {:?} disagrees with purchase {:?}", q, p),
            }
        }

        /// Reconciliation always leaves at most one batch holding exactly the counted quantity
        #[test]
        fn prop_reconciliation_collapses(layers in layers_strategy(), actual in 0i64..300, write_off in any::<bool>()) {
            let plan = reconciliation::plan(&layers, actual, 100, write_off).unwrap();
            prop_assert_eq!(plan.expected_quantity, total_quantity(&layers).unwrap());
            prop_assert_eq!(plan.difference, actual - plan.expected_quantity);
            match plan.replacement {
                Some(batch) => {
                    prop_assert!(actual > 0);
                    prop_assert_eq!(batch.quantity, actual);
                }
                None => prop_assert_eq!(actual, 0),
            }

            let costs: Vec<i64> = layers.iter().filter(|l| l.quantity > 0).map(|l| l.unit_cost_cents).collect();
            if let (Some(min), Some(max)) = (costs.iter().min(), costs.iter().max()) {
                prop_assert!(plan.unit_cost_cents >= *min && plan.unit_cost_cents <= *max);
            } else {
                prop_assert_eq!(plan.unit_cost_cents, 100);
            }
        }
    }
}

//! Inventory reconciliation
//!
//! Records a physical count as an immutable adjustment and collapses the
//! product's batches into one batch holding the counted quantity. Both writes
//! share a transaction so the audit trail and the shelf never disagree.

use serde::{Deserialize, Serialize};
use shared::models::{AdjustmentOutcome, StockAdjustment, StockBatch};
use shared::reconciliation;
use shared::validation::validate_counted_quantity;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::stock::AdjustmentRow;
use crate::services::{batches, product};

/// Reconciliation service
#[derive(Clone)]
pub struct ReconciliationService {
    db: PgPool,
}

#[derive(Debug, Deserialize)]
pub struct ReconcileInput {
    pub product_id: Uuid,
    pub actual_quantity: i64,
    pub reason: Option<String>,
    #[serde(default)]
    pub is_write_off: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileResult {
    pub adjustment: StockAdjustment,
    pub outcome: AdjustmentOutcome,
    pub message: String,
    pub message_sk: String,
    /// The single batch left on the shelf, if any
    pub batch: Option<StockBatch>,
}

impl ReconciliationService {
    /// Create a new ReconciliationService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn reconcile(&self, staff_id: Uuid, input: ReconcileInput) -> AppResult<ReconcileResult> {
        validate_counted_quantity(input.actual_quantity)?;
        let reason = input
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        let mut tx = self.db.begin().await?;

        let product = product::lock_product(&mut tx, input.product_id).await?;
        let layers = batches::lock_batches_oldest_first(&mut tx, product.id).await?;

        let plan = reconciliation::plan(
            &layers,
            input.actual_quantity,
            product.price_cents,
            input.is_write_off,
        )?;

        let adjustment: StockAdjustment = sqlx::query_as::<_, AdjustmentRow>(
            r#"
            INSERT INTO stock_adjustments
                (product_id, expected_quantity, actual_quantity, difference, reason, created_by, is_write_off)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, product_id, expected_quantity, actual_quantity, difference,
                      reason, created_by, is_write_off, created_at
            "#,
        )
        .bind(product.id)
        .bind(plan.expected_quantity)
        .bind(plan.actual_quantity)
        .bind(plan.difference)
        .bind(&reason)
        .bind(staff_id)
        .bind(plan.is_write_off)
        .fetch_one(&mut *tx)
        .await?
        .into();

        let batch = batches::replace_all(
            &mut tx,
            product.id,
            plan.actual_quantity,
            plan.unit_cost_cents,
        )
        .await?;

        tx.commit().await?;

        let outcome = plan.outcome();

        tracing::info!(
            product_id = %product.id,
            staff_id = %staff_id,
            expected = plan.expected_quantity,
            actual = plan.actual_quantity,
            difference = plan.difference,
            is_write_off = plan.is_write_off,
            unit_cost_cents = plan.unit_cost_cents,
            "Stock reconciled"
        );

        Ok(ReconcileResult {
            adjustment,
            outcome,
            message: outcome.message(),
            message_sk: outcome.message_sk(),
            batch,
        })
    }
}

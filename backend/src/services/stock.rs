//! Stock management service: listing batches, receiving stock and the
//! reconciliation history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::models::{StockAdjustment, StockAdjustmentWithProduct, StockBatch, StockBatchWithProduct};
use shared::validation::{validate_ean, validate_price, validate_product_name, validate_quantity};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::batches::{self, StockBatchRow};
use crate::services::product::ProductRow;

/// Reconciliation records shown in the staff history
const ADJUSTMENT_HISTORY_LIMIT: i64 = 100;

/// Stock service for batch listing and receiving
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

/// Input for receiving a delivery
#[derive(Debug, Deserialize)]
pub struct AddBatchInput {
    pub ean: String,
    /// Required when the EAN is not in the catalog yet
    pub name: Option<String>,
    pub quantity: i64,
    /// Unit cost of this delivery
    pub price_cents: i64,
}

/// Product summary returned after receiving stock
#[derive(Debug, Clone, Serialize)]
pub struct StockedProduct {
    pub id: Uuid,
    pub name: String,
    pub ean: String,
    pub total_stock: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddBatchResult {
    pub batch: StockBatch,
    pub product: StockedProduct,
    pub product_created: bool,
}

#[derive(Debug, FromRow)]
struct BatchListingRow {
    #[sqlx(flatten)]
    batch: StockBatchRow,
    product_name: String,
    product_ean: String,
}

#[derive(Debug, FromRow)]
pub(crate) struct AdjustmentRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub expected_quantity: i64,
    pub actual_quantity: i64,
    pub difference: i64,
    pub reason: Option<String>,
    pub created_by: Option<Uuid>,
    pub is_write_off: bool,
    pub created_at: DateTime<Utc>,
}

impl From<AdjustmentRow> for StockAdjustment {
    fn from(row: AdjustmentRow) -> Self {
        StockAdjustment {
            id: row.id,
            product_id: row.product_id,
            expected_quantity: row.expected_quantity,
            actual_quantity: row.actual_quantity,
            difference: row.difference,
            reason: row.reason,
            created_by: row.created_by,
            is_write_off: row.is_write_off,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct AdjustmentListingRow {
    #[sqlx(flatten)]
    adjustment: AdjustmentRow,
    product_name: String,
    product_ean: String,
}

impl StockService {
    /// Create a new StockService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// All non-empty batches by product name, oldest first within a product
    pub async fn list_stock(&self) -> AppResult<Vec<StockBatchWithProduct>> {
        let rows = sqlx::query_as::<_, BatchListingRow>(
            r#"
            SELECT b.id, b.product_id, b.quantity, b.price_cents, b.created_at,
                   p.name AS product_name, p.ean AS product_ean
            FROM stock_batches b
            JOIN products p ON p.id = b.product_id
            WHERE b.quantity > 0
            ORDER BY p.name ASC, b.created_at ASC, b.seq ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| StockBatchWithProduct {
                batch: r.batch.into(),
                product_name: r.product_name,
                product_ean: r.product_ean,
            })
            .collect())
    }

    /// Receive a delivery as a new batch, creating the product if the EAN is new.
    ///
    /// A new product's regular price starts at the delivery's unit cost.
    pub async fn add_batch(&self, input: AddBatchInput) -> AppResult<AddBatchResult> {
        let ean = input.ean.trim().to_string();
        validate_ean(&ean)?;
        validate_quantity(input.quantity)?;
        validate_price("price_cents", input.price_cents)?;

        let mut tx = self.db.begin().await?;

        let existing = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, ean, price_cents, sale_price_cents, sale_expires_at, created_at
            FROM products
            WHERE ean = $1
            FOR UPDATE
            "#,
        )
        .bind(&ean)
        .fetch_optional(&mut *tx)
        .await?;

        let (product, product_created) = match existing {
            Some(row) => (row, false),
            None => {
                let name = input
                    .name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
                validate_product_name(name)?;

                let row = sqlx::query_as::<_, ProductRow>(
                    r#"
                    INSERT INTO products (name, ean, price_cents)
                    VALUES ($1, $2, $3)
                    RETURNING id, name, ean, price_cents, sale_price_cents, sale_expires_at, created_at
                    "#,
                )
                .bind(name)
                .bind(&ean)
                .bind(input.price_cents)
                .fetch_one(&mut *tx)
                .await?;

                tracing::info!(product_id = %row.id, ean = %ean, name = %name, "Product created from delivery");
                (row, true)
            }
        };

        let batch = batches::add_batch(&mut tx, product.id, input.quantity, input.price_cents).await?;
        let total_stock = batches::total_stock(&mut tx, product.id).await?;

        tx.commit().await?;

        tracing::info!(
            product_id = %product.id,
            batch_id = %batch.id,
            quantity = batch.quantity,
            price_cents = batch.price_cents,
            total_stock,
            "Stock batch added"
        );

        Ok(AddBatchResult {
            batch,
            product: StockedProduct {
                id: product.id,
                name: product.name,
                ean: product.ean,
                total_stock,
            },
            product_created,
        })
    }

    /// Latest reconciliation records, newest first
    pub async fn list_adjustments(&self) -> AppResult<Vec<StockAdjustmentWithProduct>> {
        let rows = sqlx::query_as::<_, AdjustmentListingRow>(
            r#"
            SELECT sa.id, sa.product_id, sa.expected_quantity, sa.actual_quantity, sa.difference,
                   sa.reason, sa.created_by, sa.is_write_off, sa.created_at,
                   p.name AS product_name, p.ean AS product_ean
            FROM stock_adjustments sa
            JOIN products p ON p.id = sa.product_id
            ORDER BY sa.created_at DESC
            LIMIT $1
            "#,
        )
        .bind(ADJUSTMENT_HISTORY_LIMIT)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| StockAdjustmentWithProduct {
                adjustment: r.adjustment.into(),
                product_name: r.product_name,
                product_ean: r.product_ean,
            })
            .collect())
    }
}

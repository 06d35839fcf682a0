//! Batch inventory store
//!
//! Stock batches of one product, oldest first. Every function here runs on a
//! connection the caller controls, so purchase and reconciliation can compose
//! them inside a single transaction. Ordering is `created_at, seq` where `seq`
//! is the insertion order.

use chrono::{DateTime, Utc};
use shared::models::{BatchLayer, StockBatch};
use shared::validation::{validate_price, validate_quantity};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, FromRow)]
pub(crate) struct StockBatchRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub price_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl From<StockBatchRow> for StockBatch {
    fn from(row: StockBatchRow) -> Self {
        StockBatch {
            id: row.id,
            product_id: row.product_id,
            quantity: row.quantity,
            price_cents: row.price_cents,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct LayerRow {
    id: Uuid,
    quantity: i64,
    price_cents: i64,
}

impl From<LayerRow> for BatchLayer {
    fn from(row: LayerRow) -> Self {
        BatchLayer {
            batch_id: row.id,
            quantity: row.quantity,
            unit_cost_cents: row.price_cents,
        }
    }
}

/// Sum of all batch quantities for a product
pub async fn total_stock(conn: &mut PgConnection, product_id: Uuid) -> AppResult<i64> {
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM stock_batches WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(total)
}

/// Non-empty batches, oldest first
pub async fn batches_oldest_first(
    conn: &mut PgConnection,
    product_id: Uuid,
) -> AppResult<Vec<BatchLayer>> {
    let rows = sqlx::query_as::<_, LayerRow>(
        r#"
        SELECT id, quantity, price_cents
        FROM stock_batches
        WHERE product_id = $1 AND quantity > 0
        ORDER BY created_at ASC, seq ASC
        "#,
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(BatchLayer::from).collect())
}

/// Non-empty batches, oldest first, row-locked until the transaction ends
pub async fn lock_batches_oldest_first(
    conn: &mut PgConnection,
    product_id: Uuid,
) -> AppResult<Vec<BatchLayer>> {
    let rows = sqlx::query_as::<_, LayerRow>(
        r#"
        SELECT id, quantity, price_cents
        FROM stock_batches
        WHERE product_id = $1 AND quantity > 0
        ORDER BY created_at ASC, seq ASC
        FOR UPDATE
        "#,
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(BatchLayer::from).collect())
}

/// Create a new cost layer. Batches are never merged.
pub async fn add_batch(
    conn: &mut PgConnection,
    product_id: Uuid,
    quantity: i64,
    unit_cost_cents: i64,
) -> AppResult<StockBatch> {
    validate_quantity(quantity)?;
    validate_price("price_cents", unit_cost_cents)?;

    let row = sqlx::query_as::<_, StockBatchRow>(
        r#"
        INSERT INTO stock_batches (product_id, quantity, price_cents)
        VALUES ($1, $2, $3)
        RETURNING id, product_id, quantity, price_cents, created_at
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(unit_cost_cents)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

/// Take `amount` units off one batch.
///
/// Allocation never asks for more than a locked batch holds, so a refused
/// decrement means the allocation logic is broken.
pub async fn consume(conn: &mut PgConnection, batch_id: Uuid, amount: i64) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE stock_batches
        SET quantity = quantity - $1
        WHERE id = $2 AND quantity >= $1
        "#,
    )
    .bind(amount)
    .bind(batch_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::InvariantViolation(format!(
            "batch {} cannot supply {} units",
            batch_id, amount
        )));
    }

    Ok(())
}

/// Drop every batch of the product and, if anything is left, start over with one.
pub async fn replace_all(
    conn: &mut PgConnection,
    product_id: Uuid,
    new_quantity: i64,
    unit_cost_cents: i64,
) -> AppResult<Option<StockBatch>> {
    sqlx::query("DELETE FROM stock_batches WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    if new_quantity <= 0 {
        return Ok(None);
    }

    let batch = add_batch(conn, product_id, new_quantity, unit_cost_cents).await?;
    Ok(Some(batch))
}

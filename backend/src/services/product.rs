//! Product catalog service: listing, lookup, price previews and staff edits

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use shared::models::{Product, ProductWithStock};
use shared::pricing::{self, PriceQuote};
use shared::validation::{validate_ean, validate_price, validate_product_name, validate_quantity};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::batches;

/// Product catalog service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
pub(crate) struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub ean: String,
    pub price_cents: i64,
    pub sale_price_cents: Option<i64>,
    pub sale_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            ean: row.ean,
            price_cents: row.price_cents,
            sale_price_cents: row.sale_price_cents,
            sale_expires_at: row.sale_expires_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ProductStockRow {
    #[sqlx(flatten)]
    product: ProductRow,
    stock_quantity: i64,
}

impl ProductStockRow {
    fn into_model(self, now: DateTime<Utc>) -> ProductWithStock {
        ProductWithStock::from_product(self.product.into(), self.stock_quantity, now)
    }
}

const PRODUCT_WITH_STOCK: &str = r#"
    SELECT p.id, p.name, p.ean, p.price_cents, p.sale_price_cents, p.sale_expires_at, p.created_at,
           COALESCE((SELECT SUM(b.quantity) FROM stock_batches b WHERE b.product_id = p.id), 0)::BIGINT
               AS stock_quantity
    FROM products p
"#;

/// Input for editing a product
#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub name: String,
    pub ean: Option<String>,
    /// `None` ends any running sale
    pub sale_price_cents: Option<i64>,
    /// RFC 3339 timestamp, or a plain date meaning the end of that day
    pub sale_expires_at: Option<String>,
}

/// Parse a sale expiry; a date without time means 23:59:59 UTC of that day
pub fn parse_sale_expiry(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .map(|dt| dt.and_utc())
}

/// Load a product by id
pub(crate) async fn find_product(conn: &mut PgConnection, id: Uuid) -> AppResult<Product> {
    sqlx::query_as::<_, ProductRow>(
        r#"
        SELECT id, name, ean, price_cents, sale_price_cents, sale_expires_at, created_at
        FROM products
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .map(Product::from)
    .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

/// Load a product and hold its row lock until the transaction ends.
///
/// Purchases and reconciliations of the same product serialize on this lock.
pub(crate) async fn lock_product(conn: &mut PgConnection, id: Uuid) -> AppResult<Product> {
    sqlx::query_as::<_, ProductRow>(
        r#"
        SELECT id, name, ean, price_cents, sale_price_cents, sale_expires_at, created_at
        FROM products
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .map(Product::from)
    .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// All products with current stock, alphabetically
    pub async fn list_products(&self) -> AppResult<Vec<ProductWithStock>> {
        let rows = sqlx::query_as::<_, ProductStockRow>(&format!(
            "{} ORDER BY p.name ASC",
            PRODUCT_WITH_STOCK
        ))
        .fetch_all(&self.db)
        .await?;

        let now = Utc::now();
        Ok(rows.into_iter().map(|r| r.into_model(now)).collect())
    }

    /// Products on an active sale that are in stock, soonest-expiring first
    pub async fn list_on_sale(&self) -> AppResult<Vec<ProductWithStock>> {
        let now = Utc::now();
        let rows = sqlx::query_as::<_, ProductStockRow>(&format!(
            "{} WHERE p.sale_price_cents IS NOT NULL AND p.sale_expires_at > $1 \
             ORDER BY p.sale_expires_at ASC",
            PRODUCT_WITH_STOCK
        ))
        .bind(now)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| r.into_model(now))
            .filter(|p| p.stock_quantity > 0)
            .collect())
    }

    pub async fn get_product(&self, id: Uuid) -> AppResult<ProductWithStock> {
        sqlx::query_as::<_, ProductStockRow>(&format!("{} WHERE p.id = $1", PRODUCT_WITH_STOCK))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .map(|r| r.into_model(Utc::now()))
            .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    pub async fn get_product_by_ean(&self, ean: &str) -> AppResult<ProductWithStock> {
        sqlx::query_as::<_, ProductStockRow>(&format!("{} WHERE p.ean = $1", PRODUCT_WITH_STOCK))
            .bind(ean.trim())
            .fetch_optional(&self.db)
            .await?
            .map(|r| r.into_model(Utc::now()))
            .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Quote a price for `quantity` units without touching stock
    pub async fn price_preview(&self, id: Uuid, quantity: i64) -> AppResult<PriceQuote> {
        validate_quantity(quantity)?;

        let mut conn = self.db.acquire().await?;
        let product = find_product(&mut conn, id).await?;
        let layers = batches::batches_oldest_first(&mut conn, id).await?;

        Ok(pricing::quote(&product, &layers, quantity, Utc::now())?)
    }

    /// Edit name, barcode and sale of a product (staff)
    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<ProductWithStock> {
        validate_product_name(&input.name)?;
        let name = input.name.trim().to_string();

        let ean = match input.ean.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            Some(ean) => {
                validate_ean(ean)?;
                Some(ean.to_string())
            }
            None => None,
        };

        let (sale_price_cents, sale_expires_at) = match input.sale_price_cents {
            Some(price) => {
                validate_price("sale_price_cents", price)?;
                let expires_at = input
                    .sale_expires_at
                    .as_deref()
                    .and_then(parse_sale_expiry)
                    .ok_or_else(|| {
                        AppError::validation(
                            "sale_expires_at",
                            "A sale needs a valid expiry date",
                            "Akcia musí mať platný dátum ukončenia",
                        )
                    })?;
                (Some(price), Some(expires_at))
            }
            None => (None, None),
        };

        let mut tx = self.db.begin().await?;
        let current = lock_product(&mut tx, id).await?;

        if let Some(ean) = &ean {
            let taken = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM products WHERE ean = $1 AND id <> $2)",
            )
            .bind(ean)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

            if taken {
                return Err(AppError::Conflict {
                    resource: "ean".to_string(),
                    message: "Another product already uses this EAN".to_string(),
                    message_sk: "Tento EAN už používa iný produkt".to_string(),
                });
            }
        }

        sqlx::query(
            r#"
            UPDATE products
            SET name = $2, ean = $3, sale_price_cents = $4, sale_expires_at = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&name)
        .bind(ean.unwrap_or(current.ean))
        .bind(sale_price_cents)
        .bind(sale_expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(product_id = %id, name = %name, sale_price_cents = ?sale_price_cents, "Product updated");

        self.get_product(id).await
    }

    /// Delete a product whose shelf is empty (staff).
    ///
    /// Reconciliation history is an append-only audit trail, so products that
    /// have any cannot be deleted.
    pub async fn delete_product(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        let product = lock_product(&mut tx, id).await?;

        let stock = batches::total_stock(&mut tx, id).await?;
        if stock != 0 {
            return Err(AppError::validation(
                "stock",
                &format!("Cannot delete a product with {} pcs in stock", stock),
                &format!("Nie je možné zmazať produkt so skladovou zásobou {} ks", stock),
            ));
        }

        let has_history = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM stock_adjustments WHERE product_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if has_history {
            return Err(AppError::Conflict {
                resource: "product".to_string(),
                message: "Product has inventory history and cannot be deleted".to_string(),
                message_sk: "Produkt má históriu inventúr a nie je možné ho zmazať".to_string(),
            });
        }

        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(product_id = %id, name = %product.name, "Product deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_date_only_expiry_is_end_of_day() {
        assert_eq!(
            parse_sale_expiry("2024-05-31"),
            Some(Utc.with_ymd_and_hms(2024, 5, 31, 23, 59, 59).unwrap())
        );
    }

    #[test]
    fn test_rfc3339_expiry_converted_to_utc() {
        assert_eq!(
            parse_sale_expiry("2024-05-31T12:00:00+02:00"),
            Some(Utc.with_ymd_and_hms(2024, 5, 31, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_invalid_expiry() {
        assert_eq!(parse_sale_expiry("next friday"), None);
        assert_eq!(parse_sale_expiry("2024-02-30"), None);
    }
}

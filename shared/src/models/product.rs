//! Product catalog models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A product sold in the canteen
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    /// Barcode, unique across the catalog
    pub ean: String,
    /// Regular unit price
    pub price_cents: i64,
    /// Promotional unit price, only honoured while `sale_expires_at` is in the future
    pub sale_price_cents: Option<i64>,
    pub sale_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Promotional price if the sale has not yet expired at `now`
    pub fn active_sale_price(&self, now: DateTime<Utc>) -> Option<i64> {
        match (self.sale_price_cents, self.sale_expires_at) {
            (Some(price), Some(expires_at)) if expires_at > now => Some(price),
            _ => None,
        }
    }

    pub fn has_active_sale(&self, now: DateTime<Utc>) -> bool {
        self.active_sale_price(now).is_some()
    }
}

/// A product together with its current stock level, as shown in the catalog.
///
/// Sale fields are masked out once the promotion has expired so callers never
/// have to re-check the expiry themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductWithStock {
    pub id: Uuid,
    pub name: String,
    pub ean: String,
    pub price_cents: i64,
    pub sale_price_cents: Option<i64>,
    pub sale_expires_at: Option<DateTime<Utc>>,
    pub stock_quantity: i64,
    pub created_at: DateTime<Utc>,
}

impl ProductWithStock {
    pub fn from_product(product: Product, stock_quantity: i64, now: DateTime<Utc>) -> Self {
        let active = product.has_active_sale(now);
        Self {
            id: product.id,
            name: product.name,
            ean: product.ean,
            price_cents: product.price_cents,
            sale_price_cents: if active { product.sale_price_cents } else { None },
            sale_expires_at: if active { product.sale_expires_at } else { None },
            stock_quantity,
            created_at: product.created_at,
        }
    }
}

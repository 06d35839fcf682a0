//! Pricing engine
//!
//! Prices a request for `n` units of a product either at its active
//! promotional price or by walking the product's stock batches oldest-first
//! (FIFO costing). All arithmetic is in integer cents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{total_quantity, BatchLayer, Product};
use crate::types::{cents_to_eur, div_round, Overflow};

/// Reasons a quote or purchase plan cannot be produced
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("Quantity must be a positive integer")]
    InvalidQuantity,

    #[error("Product is out of stock")]
    NoStock,

    #[error("Insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: i64, requested: i64 },

    #[error(transparent)]
    Overflow(#[from] Overflow),
}

/// Units taken from one batch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Allocation {
    pub batch_id: Uuid,
    #[serde(rename = "qty")]
    pub quantity: i64,
    /// Price charged per unit for this allocation (batch cost, or the sale price)
    pub price_cents: i64,
}

impl Allocation {
    pub fn total_cents(&self) -> Result<i64, Overflow> {
        self.quantity.checked_mul(self.price_cents).ok_or(Overflow)
    }
}

/// One priced line of a quote
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BreakdownLine {
    pub quantity: i64,
    pub price_cents: i64,
}

/// Price preview for a product and quantity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceQuote {
    pub quantity: i64,
    pub total_cents: i64,
    pub total_eur: rust_decimal::Decimal,
    /// Display-only average; the exact amount is `total_cents`
    pub unit_price_cents: i64,
    pub breakdown: Vec<BreakdownLine>,
    pub is_sale: bool,
    pub available_stock: i64,
}

/// What a purchase will consume and charge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchasePlan {
    pub quantity: i64,
    pub total_cents: i64,
    pub is_sale: bool,
    pub allocations: Vec<Allocation>,
}

/// Take `quantity` units from `layers` oldest-first.
///
/// Each allocation carries its batch's own unit cost. Empty layers are
/// skipped. Fails without allocating anything when stock is short.
pub fn allocate_fifo(layers: &[BatchLayer], quantity: i64) -> Result<Vec<Allocation>, PricingError> {
    if quantity <= 0 {
        return Err(PricingError::InvalidQuantity);
    }

    let available = total_quantity(layers)?;
    if available < quantity {
        return Err(PricingError::InsufficientStock {
            available,
            requested: quantity,
        });
    }

    let mut remaining = quantity;
    let mut allocations = Vec::new();

    for layer in layers.iter().filter(|l| l.quantity > 0) {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(layer.quantity);
        allocations.push(Allocation {
            batch_id: layer.batch_id,
            quantity: take,
            price_cents: layer.unit_cost_cents,
        });
        remaining -= take;
    }

    Ok(allocations)
}

fn allocations_total(allocations: &[Allocation]) -> Result<i64, Overflow> {
    allocations
        .iter()
        .try_fold(0i64, |acc, a| acc.checked_add(a.total_cents()?).ok_or(Overflow))
}

/// Plan a purchase: which batches to decrement and what to charge.
///
/// Stock is always consumed FIFO. An active sale replaces every allocation's
/// unit price with the sale price; otherwise each batch charges its own cost.
pub fn plan_purchase(
    product: &Product,
    layers: &[BatchLayer],
    quantity: i64,
    now: DateTime<Utc>,
) -> Result<PurchasePlan, PricingError> {
    let sale_price = product.active_sale_price(now);
    let mut allocations = allocate_fifo(layers, quantity)?;

    if let Some(price) = sale_price {
        for allocation in &mut allocations {
            allocation.price_cents = price;
        }
    }

    let total_cents = allocations_total(&allocations)?;

    Ok(PurchasePlan {
        quantity,
        total_cents,
        is_sale: sale_price.is_some(),
        allocations,
    })
}

/// Quote a price for `quantity` units without touching stock.
///
/// A product with no stock at all yields `NoStock`; one with some stock but
/// not enough yields `InsufficientStock`.
pub fn quote(
    product: &Product,
    layers: &[BatchLayer],
    quantity: i64,
    now: DateTime<Utc>,
) -> Result<PriceQuote, PricingError> {
    if quantity <= 0 {
        return Err(PricingError::InvalidQuantity);
    }

    let available_stock = total_quantity(layers)?;
    if available_stock == 0 {
        return Err(PricingError::NoStock);
    }

    if let Some(sale_price) = product.active_sale_price(now) {
        if available_stock < quantity {
            return Err(PricingError::InsufficientStock {
                available: available_stock,
                requested: quantity,
            });
        }
        let total_cents = sale_price.checked_mul(quantity).ok_or(Overflow)?;
        return Ok(PriceQuote {
            quantity,
            total_cents,
            total_eur: cents_to_eur(total_cents),
            unit_price_cents: sale_price,
            breakdown: vec![BreakdownLine {
                quantity,
                price_cents: sale_price,
            }],
            is_sale: true,
            available_stock,
        });
    }

    let allocations = allocate_fifo(layers, quantity)?;
    let total_cents = allocations_total(&allocations)?;
    let breakdown = allocations
        .iter()
        .map(|a| BreakdownLine {
            quantity: a.quantity,
            price_cents: a.price_cents,
        })
        .collect();

    Ok(PriceQuote {
        quantity,
        total_cents,
        total_eur: cents_to_eur(total_cents),
        unit_price_cents: div_round(total_cents, quantity),
        breakdown,
        is_sale: false,
        available_stock,
    })
}

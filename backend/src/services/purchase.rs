//! Purchase transaction
//!
//! Consumes stock FIFO, prices it and debits the buyer, all in one database
//! transaction. The product row lock serializes concurrent purchases of the
//! same product, so two buyers can never both spend the same stock snapshot.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::ledger::purchase_description;
use shared::pricing::{self, Allocation};
use shared::types::cents_to_eur;
use shared::validation::validate_quantity;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::{account, batches, product};

/// Purchase service
#[derive(Clone)]
pub struct PurchaseService {
    db: PgPool,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseInput {
    pub product_id: Uuid,
    pub quantity: i64,
}

/// What was bought, how it was priced and where it leaves the buyer
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReceipt {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i64,
    pub total_cents: i64,
    pub total_eur: Decimal,
    pub is_sale: bool,
    pub allocations: Vec<Allocation>,
    pub new_balance_cents: i64,
    pub new_balance_eur: Decimal,
}

impl PurchaseService {
    /// Create a new PurchaseService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Buy `quantity` units of a product on the user's account.
    ///
    /// Either every batch decrement and the ledger debit persist, or nothing
    /// does. Insufficient stock aborts before any write.
    pub async fn purchase(&self, user_id: Uuid, input: PurchaseInput) -> AppResult<PurchaseReceipt> {
        validate_quantity(input.quantity)?;

        let mut tx = self.db.begin().await?;

        let product = product::lock_product(&mut tx, input.product_id).await?;
        let layers = batches::lock_batches_oldest_first(&mut tx, product.id).await?;

        let plan = pricing::plan_purchase(&product, &layers, input.quantity, Utc::now())?;

        for allocation in &plan.allocations {
            batches::consume(&mut tx, allocation.batch_id, allocation.quantity).await?;
        }

        account::append_entry(
            &mut tx,
            user_id,
            -plan.total_cents,
            Some(&purchase_description(input.quantity, &product.name)),
        )
        .await?;

        let new_balance_cents = account::balance_of(&mut tx, user_id).await?;

        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            product_id = %product.id,
            quantity = input.quantity,
            total_cents = plan.total_cents,
            is_sale = plan.is_sale,
            batches = plan.allocations.len(),
            "Purchase recorded"
        );

        Ok(PurchaseReceipt {
            product_id: product.id,
            product_name: product.name,
            quantity: plan.quantity,
            total_cents: plan.total_cents,
            total_eur: cents_to_eur(plan.total_cents),
            is_sale: plan.is_sale,
            allocations: plan.allocations,
            new_balance_cents,
            new_balance_eur: cents_to_eur(new_balance_cents),
        })
    }
}

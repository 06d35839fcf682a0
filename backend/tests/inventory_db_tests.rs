//! Inventory and purchase tests against Postgres
//!
//! Run with a database: `DATABASE_URL=postgres://... cargo test -- --ignored`

mod common;

use canteen_backend::error::AppError;
use canteen_backend::services::product::UpdateProductInput;
use canteen_backend::services::purchase::PurchaseInput;
use canteen_backend::services::reconciliation::ReconcileInput;
use canteen_backend::services::stock::AddBatchInput;
use canteen_backend::services::{ProductService, PurchaseService, ReconciliationService, StockService};
use shared::models::AdjustmentOutcome;
use sqlx::PgPool;

// ============================================================================
// Purchase
// ============================================================================

#[sqlx::test(migrations = "./migrations")]
#[ignore] // Requires database connection
async fn test_purchase_consumes_oldest_batch_first(pool: PgPool) {
    let buyer = common::create_user(&pool, "jana@firma.sk", "user").await;
    let product = common::stocked_product(&pool, "8584004040115", "Horalky", &[(5, 100), (5, 120)]).await;

    let receipt = PurchaseService::new(pool.clone())
        .purchase(buyer, PurchaseInput { product_id: product, quantity: 7 })
        .await
        .unwrap();

    assert_eq!(receipt.total_cents, 740);
    assert!(!receipt.is_sale);
    assert_eq!(receipt.allocations.len(), 2);
    assert_eq!(receipt.new_balance_cents, -740);
    assert_eq!(common::batch_quantities(&pool, product).await, vec![0, 3]);
    assert_eq!(common::ledger_amounts(&pool, buyer).await, vec![-740]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore] // Requires database connection
async fn test_insufficient_stock_changes_nothing(pool: PgPool) {
    let buyer = common::create_user(&pool, "jana@firma.sk", "user").await;
    let product = common::stocked_product(&pool, "8584004040115", "Horalky", &[(2, 100), (3, 120)]).await;

    let err = PurchaseService::new(pool.clone())
        .purchase(buyer, PurchaseInput { product_id: product, quantity: 6 })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InsufficientStock { available: 5, requested: 6 }));
    assert_eq!(common::batch_quantities(&pool, product).await, vec![2, 3]);
    assert!(common::ledger_amounts(&pool, buyer).await.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore] // Requires database connection
async fn test_failed_ledger_debit_restores_batches(pool: PgPool) {
    let product = common::stocked_product(&pool, "8584004040115", "Horalky", &[(5, 100), (5, 120)]).await;
    // No users row, so the debit is refused after both batches were decremented
    let ghost = uuid::Uuid::new_v4();

    let err = PurchaseService::new(pool.clone())
        .purchase(ghost, PurchaseInput { product_id: product, quantity: 7 })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::DatabaseError(_)));
    assert_eq!(common::batch_quantities(&pool, product).await, vec![5, 5]);
    let entries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account_entries")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(entries, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore] // Requires database connection
async fn test_purchase_of_unknown_product(pool: PgPool) {
    let buyer = common::create_user(&pool, "jana@firma.sk", "user").await;

    let err = PurchaseService::new(pool.clone())
        .purchase(buyer, PurchaseInput { product_id: uuid::Uuid::new_v4(), quantity: 1 })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore] // Requires database connection
async fn test_concurrent_purchases_never_oversell(pool: PgPool) {
    let first = common::create_user(&pool, "jana@firma.sk", "user").await;
    let second = common::create_user(&pool, "peter@firma.sk", "user").await;
    let product = common::stocked_product(&pool, "8584004040115", "Horalky", &[(4, 100), (6, 120)]).await;

    let service = PurchaseService::new(pool.clone());
    let (a, b) = tokio::join!(
        service.purchase(first, PurchaseInput { product_id: product, quantity: 6 }),
        service.purchase(second, PurchaseInput { product_id: product, quantity: 6 }),
    );

    let results = [a, b];
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let refused = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::InsufficientStock { available: 4, requested: 6 })))
        .count();
    assert_eq!(succeeded, 1);
    assert_eq!(refused, 1);

    let remaining: i64 = common::batch_quantities(&pool, product).await.iter().sum();
    assert_eq!(remaining, 4);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore] // Requires database connection
async fn test_sale_price_applies_to_every_unit(pool: PgPool) {
    let buyer = common::create_user(&pool, "jana@firma.sk", "user").await;
    let product = common::stocked_product(&pool, "8584004040115", "Horalky", &[(2, 80), (5, 90)]).await;

    ProductService::new(pool.clone())
        .update_product(
            product,
            UpdateProductInput {
                name: "Horalky".to_string(),
                ean: None,
                sale_price_cents: Some(50),
                sale_expires_at: Some("2999-12-31".to_string()),
            },
        )
        .await
        .unwrap();

    let receipt = PurchaseService::new(pool.clone())
        .purchase(buyer, PurchaseInput { product_id: product, quantity: 3 })
        .await
        .unwrap();

    assert_eq!(receipt.total_cents, 150);
    assert!(receipt.is_sale);
    assert_eq!(common::batch_quantities(&pool, product).await, vec![0, 4]);
}

// ============================================================================
// Catalog and stock
// ============================================================================

#[sqlx::test(migrations = "./migrations")]
#[ignore] // Requires database connection
async fn test_add_batch_for_unknown_ean_needs_name(pool: PgPool) {
    let err = StockService::new(pool.clone())
        .add_batch(AddBatchInput {
            ean: "8584004040115".to_string(),
            name: None,
            quantity: 10,
            price_cents: 60,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore] // Requires database connection
async fn test_price_preview_reports_stock(pool: PgPool) {
    let product = common::stocked_product(&pool, "8584004040115", "Horalky", &[(5, 100), (5, 120)]).await;
    let service = ProductService::new(pool.clone());

    let quote = service.price_preview(product, 7).await.unwrap();
    assert_eq!(quote.total_cents, 740);
    assert_eq!(quote.available_stock, 10);

    let err = service.price_preview(product, 11).await.unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { available: 10, requested: 11 }));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore] // Requires database connection
async fn test_product_with_stock_cannot_be_deleted(pool: PgPool) {
    let product = common::stocked_product(&pool, "8584004040115", "Horalky", &[(1, 60)]).await;

    let err = ProductService::new(pool.clone())
        .delete_product(product)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation { .. }));
}

// ============================================================================
// Reconciliation
// ============================================================================

#[sqlx::test(migrations = "./migrations")]
#[ignore] // Requires database connection
async fn test_reconciliation_collapses_batches(pool: PgPool) {
    let staff = common::create_user(&pool, "office@firma.sk", "office_assistant").await;
    let product =
        common::stocked_product(&pool, "8584004040115", "Horalky", &[(10, 50), (20, 60), (20, 80)]).await;
    let service = ReconciliationService::new(pool.clone());

    let result = service
        .reconcile(
            staff,
            ReconcileInput {
                product_id: product,
                actual_quantity: 40,
                reason: Some("Monthly count".to_string()),
                is_write_off: false,
            },
        )
        .await
        .unwrap();

    assert_eq!(result.adjustment.expected_quantity, 50);
    assert_eq!(result.adjustment.difference, -10);
    assert_eq!(result.outcome, AdjustmentOutcome::Shortage(10));
    // (10*50 + 20*60 + 20*80) / 50 = 66
    assert_eq!(result.batch.as_ref().map(|b| b.price_cents), Some(66));
    assert_eq!(common::batch_quantities(&pool, product).await, vec![40]);

    service
        .reconcile(
            staff,
            ReconcileInput {
                product_id: product,
                actual_quantity: 0,
                reason: None,
                is_write_off: true,
            },
        )
        .await
        .unwrap();

    assert!(common::batch_quantities(&pool, product).await.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore] // Requires database connection
async fn test_failed_batch_rewrite_discards_adjustment(pool: PgPool) {
    let staff = common::create_user(&pool, "office@firma.sk", "office_assistant").await;
    let product = common::stocked_product(&pool, "8584004040115", "Horalky", &[(10, 50), (20, 60)]).await;

    // Existing batches pass; the collapsed batch of 40 will not
    sqlx::query("ALTER TABLE stock_batches ADD CONSTRAINT batch_size_cap CHECK (quantity <= 30)")
        .execute(&pool)
        .await
        .unwrap();

    let err = ReconciliationService::new(pool.clone())
        .reconcile(
            staff,
            ReconcileInput {
                product_id: product,
                actual_quantity: 40,
                reason: Some("Recount".to_string()),
                is_write_off: false,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::DatabaseError(_)));
    assert_eq!(common::batch_quantities(&pool, product).await, vec![10, 20]);
    let adjustments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_adjustments")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(adjustments, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore] // Requires database connection
async fn test_reconciled_product_keeps_audit_trail(pool: PgPool) {
    let staff = common::create_user(&pool, "office@firma.sk", "office_assistant").await;
    let product = common::stocked_product(&pool, "8584004040115", "Horalky", &[(3, 60)]).await;

    ReconciliationService::new(pool.clone())
        .reconcile(
            staff,
            ReconcileInput {
                product_id: product,
                actual_quantity: 0,
                reason: Some("Expired".to_string()),
                is_write_off: true,
            },
        )
        .await
        .unwrap();

    let err = ProductService::new(pool.clone())
        .delete_product(product)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict { .. }));

    let adjustments = StockService::new(pool.clone()).list_adjustments().await.unwrap();
    assert_eq!(adjustments.len(), 1);
}

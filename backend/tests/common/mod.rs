//! Helpers shared by the backend integration tests

#![allow(dead_code)]

use canteen_backend::config::{
    AuthConfig, Config, DatabaseConfig, EmailConfig, EmailMode, JwtConfig, ReminderConfig,
    ServerConfig,
};
use canteen_backend::services::stock::AddBatchInput;
use canteen_backend::services::{Notifier, StockService};
use sqlx::PgPool;
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration-test-secret";

pub fn test_config() -> Config {
    Config {
        environment: "test".to_string(),
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
            cors_origin: "*".to_string(),
        },
        database: DatabaseConfig {
            url: "postgres://localhost/canteen_test".to_string(),
            max_connections: 2,
            min_connections: 0,
        },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
            token_expiry_days: 365,
        },
        auth: AuthConfig {
            allowed_email_domains: vec!["firma.sk".to_string()],
            office_assistant_emails: vec!["office@firma.sk".to_string()],
            code_expiry_minutes: 10,
        },
        email: EmailConfig {
            mode: EmailMode::Console,
            from_address: "bufet@firma.sk".to_string(),
            resend_api_key: None,
            relay_url: None,
        },
        reminder: ReminderConfig {
            enabled: false,
            debt_threshold_cents: -500,
            day_of_month: 1,
            hour_utc: 8,
        },
    }
}

pub fn notifier() -> Notifier {
    Notifier::console("bufet@firma.sk")
}

pub async fn create_user(pool: &PgPool, email: &str, role: &str) -> Uuid {
    sqlx::query_scalar::<_, Uuid>("INSERT INTO users (email, role) VALUES ($1, $2) RETURNING id")
        .bind(email)
        .bind(role)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Create a product and receive one batch per `(quantity, unit cost)`, oldest first
pub async fn stocked_product(pool: &PgPool, ean: &str, name: &str, batches: &[(i64, i64)]) -> Uuid {
    let service = StockService::new(pool.clone());
    let mut product_id = None;
    for &(quantity, price_cents) in batches {
        let result = service
            .add_batch(AddBatchInput {
                ean: ean.to_string(),
                name: Some(name.to_string()),
                quantity,
                price_cents,
            })
            .await
            .unwrap();
        product_id = Some(result.product.id);
    }
    product_id.unwrap()
}

/// Batch quantities of a product, oldest first
pub async fn batch_quantities(pool: &PgPool, product_id: Uuid) -> Vec<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT quantity FROM stock_batches WHERE product_id = $1 ORDER BY created_at, seq",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await
    .unwrap()
}

pub async fn ledger_amounts(pool: &PgPool, user_id: Uuid) -> Vec<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT amount_cents FROM account_entries WHERE user_id = $1 ORDER BY created_at, seq",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .unwrap()
}

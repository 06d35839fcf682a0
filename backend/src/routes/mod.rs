//! Route definitions for the canteen API

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes(state.clone()))
        .nest("/products", product_routes(state.clone()))
        .nest("/purchases", purchase_routes(state.clone()))
        .nest("/stock", stock_routes(state.clone()))
        .nest("/account", account_routes(state.clone()))
        .nest("/admin", admin_routes(state))
}

/// Authentication routes; code exchange is public
fn auth_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/profile", put(handlers::update_profile))
        .route("/logout-all", post(handlers::logout_all))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/request-code", post(handlers::request_code))
        .route("/verify-code", post(handlers::verify_code))
        .merge(protected)
}

/// Catalog reads are public, edits are staff only
fn product_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route(
            "/:id",
            put(handlers::update_product).delete(handlers::delete_product),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/", get(handlers::list_products))
        .route("/on-sale", get(handlers::list_on_sale))
        .route("/by-ean/:ean", get(handlers::get_product_by_ean))
        .route("/:id", get(handlers::get_product))
        .route("/:id/price-preview", get(handlers::price_preview))
        .merge(protected)
}

fn purchase_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_purchase))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Stock management routes (staff)
fn stock_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stock))
        .route("/add-batch", post(handlers::add_batch))
        .route("/adjustment", post(handlers::create_adjustment))
        .route("/adjustments", get(handlers::list_adjustments))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

fn account_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/balances", get(handlers::list_balances))
        .route("/my-balance", get(handlers::my_balance))
        .route("/my-history", get(handlers::my_history))
        .route("/history/:user_id", get(handlers::user_history))
        .route("/deposit", post(handlers::deposit))
        .route("/shortage-summary", get(handlers::shortage_summary))
        .route("/shortage-warning", get(handlers::shortage_warning))
        .route("/acknowledge-shortage", post(handlers::acknowledge_shortage))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Administration routes (staff)
fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/debtors", get(handlers::list_debtors))
        .route("/users", get(handlers::list_users))
        .route("/reminder", post(handlers::send_reminders))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

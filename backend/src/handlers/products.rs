//! HTTP handlers for the product catalog

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::models::ProductWithStock;
use shared::pricing::PriceQuote;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{require_staff, CurrentUser};
use crate::services::product::UpdateProductInput;
use crate::services::ProductService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PricePreviewQuery {
    pub quantity: Option<i64>,
}

/// List all products with stock
pub async fn list_products(State(state): State<AppState>) -> AppResult<Json<Vec<ProductWithStock>>> {
    let products = ProductService::new(state.db).list_products().await?;
    Ok(Json(products))
}

/// Products with an active sale and stock left
pub async fn list_on_sale(State(state): State<AppState>) -> AppResult<Json<Vec<ProductWithStock>>> {
    let products = ProductService::new(state.db).list_on_sale().await?;
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ProductWithStock>> {
    let product = ProductService::new(state.db).get_product(id).await?;
    Ok(Json(product))
}

/// Look a product up by scanned barcode
pub async fn get_product_by_ean(
    State(state): State<AppState>,
    Path(ean): Path<String>,
) -> AppResult<Json<ProductWithStock>> {
    let product = ProductService::new(state.db).get_product_by_ean(&ean).await?;
    Ok(Json(product))
}

/// Quote a purchase without buying
pub async fn price_preview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<PricePreviewQuery>,
) -> AppResult<Json<PriceQuote>> {
    let quote = ProductService::new(state.db)
        .price_preview(id, query.quantity.unwrap_or(1))
        .await?;
    Ok(Json(quote))
}

pub async fn update_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<ProductWithStock>> {
    require_staff(&current_user.0)?;
    let product = ProductService::new(state.db).update_product(id, input).await?;
    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    require_staff(&current_user.0)?;
    ProductService::new(state.db).delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

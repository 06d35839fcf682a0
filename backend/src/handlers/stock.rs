//! HTTP handlers for stock management (staff only)

use axum::{extract::State, Json};
use shared::models::{StockAdjustmentWithProduct, StockBatchWithProduct};

use crate::error::AppResult;
use crate::middleware::{require_staff, CurrentUser};
use crate::services::reconciliation::{ReconcileInput, ReconcileResult};
use crate::services::stock::{AddBatchInput, AddBatchResult};
use crate::services::{ReconciliationService, StockService};
use crate::AppState;

pub async fn list_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<StockBatchWithProduct>>> {
    require_staff(&current_user.0)?;
    let batches = StockService::new(state.db).list_stock().await?;
    Ok(Json(batches))
}

/// Receive a delivery; unknown barcodes create the product when named
pub async fn add_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<AddBatchInput>,
) -> AppResult<Json<AddBatchResult>> {
    require_staff(&current_user.0)?;
    let result = StockService::new(state.db).add_batch(input).await?;
    Ok(Json(result))
}

/// Record a physical count
pub async fn create_adjustment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ReconcileInput>,
) -> AppResult<Json<ReconcileResult>> {
    require_staff(&current_user.0)?;
    let result = ReconciliationService::new(state.db)
        .reconcile(current_user.0.user_id, input)
        .await?;
    Ok(Json(result))
}

pub async fn list_adjustments(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<StockAdjustmentWithProduct>>> {
    require_staff(&current_user.0)?;
    let adjustments = StockService::new(state.db).list_adjustments().await?;
    Ok(Json(adjustments))
}

//! Purchase handler

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::purchase::{PurchaseInput, PurchaseReceipt};
use crate::services::PurchaseService;
use crate::AppState;

/// Buy on the caller's own account
pub async fn create_purchase(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<PurchaseInput>,
) -> AppResult<Json<PurchaseReceipt>> {
    let receipt = PurchaseService::new(state.db)
        .purchase(current_user.0.user_id, input)
        .await?;
    Ok(Json(receipt))
}

//! HTTP handlers for accounts, deposits and shortages

use axum::{
    extract::{Path, State},
    Json,
};
use shared::models::{AccountBalance, HistoryEntry, ShortageSummary, ShortageWarning};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{require_staff, CurrentUser};
use crate::services::account::{DepositInput, DepositReceipt, MY_HISTORY_LIMIT};
use crate::services::shortage::AcknowledgeResponse;
use crate::services::{AccountService, ShortageService};
use crate::AppState;

fn account_service(state: &AppState) -> AccountService {
    AccountService::new(state.db.clone(), state.notifier.clone())
}

/// Staff get everyone, others just themselves
pub async fn list_balances(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<AccountBalance>>> {
    let balances = account_service(&state)
        .balances(current_user.0.user_id, current_user.0.role)
        .await?;
    Ok(Json(balances))
}

pub async fn my_balance(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<AccountBalance>> {
    let balance = account_service(&state).balance(current_user.0.user_id).await?;
    Ok(Json(balance))
}

pub async fn my_history(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<HistoryEntry>>> {
    let history = account_service(&state)
        .history(current_user.0.user_id, Some(MY_HISTORY_LIMIT))
        .await?;
    Ok(Json(history))
}

/// Full history of a user; the user themself or staff
pub async fn user_history(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<HistoryEntry>>> {
    let caller = &current_user.0;
    if caller.user_id != user_id && !caller.is_office_assistant() {
        return Err(AppError::InsufficientPermissions);
    }
    let history = account_service(&state).history(user_id, None).await?;
    Ok(Json(history))
}

pub async fn deposit(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<DepositInput>,
) -> AppResult<Json<DepositReceipt>> {
    require_staff(&current_user.0)?;
    let receipt = account_service(&state)
        .deposit(current_user.0.user_id, input)
        .await?;
    Ok(Json(receipt))
}

pub async fn shortage_summary(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ShortageSummary>> {
    require_staff(&current_user.0)?;
    let summary = ShortageService::new(state.db).summary().await?;
    Ok(Json(summary))
}

pub async fn shortage_warning(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ShortageWarning>> {
    let warning = ShortageService::new(state.db)
        .warning_for(current_user.0.user_id)
        .await?;
    Ok(Json(warning))
}

pub async fn acknowledge_shortage(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<AcknowledgeResponse>> {
    let response = ShortageService::new(state.db)
        .acknowledge(current_user.0.user_id)
        .await?;
    Ok(Json(response))
}

//! Staff administration handlers

use axum::{extract::State, Json};
use shared::models::AccountBalance;

use crate::error::AppResult;
use crate::middleware::{require_staff, CurrentUser};
use crate::services::reminder::ReminderReport;
use crate::services::{AccountService, ReminderService};
use crate::AppState;

pub async fn list_debtors(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<AccountBalance>>> {
    require_staff(&current_user.0)?;
    let debtors = AccountService::new(state.db, state.notifier).debtors().await?;
    Ok(Json(debtors))
}

pub async fn list_users(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<AccountBalance>>> {
    require_staff(&current_user.0)?;
    let users = AccountService::new(state.db, state.notifier).users().await?;
    Ok(Json(users))
}

/// Run the debt reminder sweep now
pub async fn send_reminders(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ReminderReport>> {
    require_staff(&current_user.0)?;
    let accounts = AccountService::new(state.db, state.notifier.clone());
    let report = ReminderService::new(accounts, state.notifier, state.config.reminder.debt_threshold_cents)
        .send_reminders()
        .await?;
    Ok(Json(report))
}

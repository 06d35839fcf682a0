//! Authentication handlers

use axum::{extract::State, Json};

use super::MessageResponse;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::auth::{AuthResponse, RequestCodeInput, UpdateProfileInput, VerifyCodeInput};
use crate::services::AuthService;
use crate::AppState;

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(state.db.clone(), state.notifier.clone(), &state.config)
}

/// Email a one-time login code
pub async fn request_code(
    State(state): State<AppState>,
    Json(body): Json<RequestCodeInput>,
) -> AppResult<Json<MessageResponse>> {
    auth_service(&state).request_code(body).await?;
    Ok(Json(MessageResponse::new("Verification code sent")))
}

/// Exchange a login code for a token
pub async fn verify_code(
    State(state): State<AppState>,
    Json(body): Json<VerifyCodeInput>,
) -> AppResult<Json<AuthResponse>> {
    let response = auth_service(&state).verify_code(body).await?;
    Ok(Json(response))
}

/// Change the display name; returns a fresh token carrying it
pub async fn update_profile(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(body): Json<UpdateProfileInput>,
) -> AppResult<Json<AuthResponse>> {
    let response = auth_service(&state)
        .update_profile(current_user.0.user_id, body)
        .await?;
    Ok(Json(response))
}

/// Revoke every token issued to the caller
pub async fn logout_all(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<MessageResponse>> {
    auth_service(&state)
        .logout_everywhere(current_user.0.user_id)
        .await?;
    Ok(Json(MessageResponse::new("Logged out from all devices")))
}

//! Authentication middleware
//!
//! Bearer-token authentication with server-side revocation, and the staff
//! guard used by office assistant handlers

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use shared::models::UserRole;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::auth::decode_token;
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub token_version: i32,
}

impl AuthUser {
    pub fn is_office_assistant(&self) -> bool {
        self.role == UserRole::OfficeAssistant
    }
}

/// Validates the bearer token and checks it has not been revoked.
///
/// A token is revoked once the user's `token_version` has moved past the
/// version it was issued with.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AppError::InvalidToken)?;

    let claims = decode_token(&state.config.jwt.secret, token)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;

    let current_version =
        sqlx::query_scalar::<_, i32>("SELECT token_version FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&state.db)
            .await?
            .ok_or(AppError::InvalidToken)?;

    if current_version != claims.token_version {
        tracing::debug!(user_id = %user_id, "Rejected revoked token");
        return Err(AppError::TokenRevoked);
    }

    request.extensions_mut().insert(AuthUser {
        user_id,
        email: claims.email,
        name: claims.name,
        role: claims.role,
        token_version: claims.token_version,
    });

    Ok(next.run(request).await)
}

/// Extractor for authenticated user
/// Use this in handlers behind `auth_middleware`
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or(AppError::InvalidToken)
    }
}

/// Staff guard for use in handlers
pub fn require_staff(user: &AuthUser) -> AppResult<()> {
    if user.is_office_assistant() {
        Ok(())
    } else {
        Err(AppError::InsufficientPermissions)
    }
}

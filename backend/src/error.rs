//! Error handling for the canteen server
//!
//! Provides consistent error responses in English and Slovak

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::ledger::DepositError;
use shared::{Overflow, PricingError, ValidationError as FieldError};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid or expired code")]
    InvalidCode,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token revoked")]
    TokenRevoked,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Email domain not allowed")]
    EmailDomainNotAllowed { allowed: Vec<String> },

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_sk: String,
    },

    #[error("Conflict: {message}")]
    Conflict {
        resource: String,
        message: String,
        message_sk: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Inventory errors
    #[error("Insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: i64, requested: i64 },

    #[error("Product is out of stock")]
    NoStock,

    /// Allocation logic produced something storage refused; a bug, never a user error
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    // External service errors
    #[error("Email delivery failed: {0}")]
    Email(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(field: &str, message: &str, message_sk: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
            message_sk: message_sk.to_string(),
        }
    }
}

impl From<FieldError> for AppError {
    fn from(err: FieldError) -> Self {
        AppError::validation(err.field, err.message, err.message_sk)
    }
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::InvalidQuantity => AppError::validation(
                "quantity",
                "Quantity must be a positive integer",
                "Množstvo musí byť kladné celé číslo",
            ),
            PricingError::NoStock => AppError::NoStock,
            PricingError::InsufficientStock {
                available,
                requested,
            } => AppError::InsufficientStock {
                available,
                requested,
            },
            PricingError::Overflow(err) => err.into(),
        }
    }
}

impl From<Overflow> for AppError {
    fn from(err: Overflow) -> Self {
        AppError::InvariantViolation(err.to_string())
    }
}

impl From<DepositError> for AppError {
    fn from(err: DepositError) -> Self {
        match err {
            DepositError::NonPositiveAmount => AppError::validation(
                "amount_cents",
                "Amount must be positive",
                "Suma musí byť kladná",
            ),
            DepositError::NegativeContribution => AppError::validation(
                "contribution_cents",
                "Contribution cannot be negative",
                "Príspevok nemôže byť záporný",
            ),
            DepositError::ContributionExceedsAmount { .. } => AppError::validation(
                "contribution_cents",
                "Contribution cannot exceed the deposited amount",
                "Príspevok nemôže presiahnuť vloženú sumu",
            ),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_sk: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorDetail {
    fn new(code: &str, message_en: impl Into<String>, message_sk: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message_en: message_en.into(),
            message_sk: message_sk.into(),
            field: None,
            details: None,
        }
    }

    fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCode | AppError::InvalidToken | AppError::TokenRevoked => {
                StatusCode::UNAUTHORIZED
            }
            AppError::InsufficientPermissions | AppError::EmailDomainNotAllowed { .. } => {
                StatusCode::FORBIDDEN
            }
            AppError::Validation { .. } | AppError::InsufficientStock { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::NotFound(_) | AppError::NoStock => StatusCode::NOT_FOUND,
            AppError::Email(_) => StatusCode::BAD_GATEWAY,
            AppError::InvariantViolation(_)
            | AppError::Configuration(_)
            | AppError::DatabaseError(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> ErrorDetail {
        match self {
            AppError::InvalidCode => ErrorDetail::new(
                "INVALID_CODE",
                "Invalid or expired code",
                "Neplatný alebo expirovaný kód",
            ),
            AppError::InvalidToken => {
                ErrorDetail::new("INVALID_TOKEN", "Invalid token", "Neplatný token")
            }
            AppError::TokenRevoked => ErrorDetail::new(
                "TOKEN_REVOKED",
                "Token has been revoked, please sign in again",
                "Token bol zneplatnený, prihláste sa znova",
            ),
            AppError::InsufficientPermissions => ErrorDetail::new(
                "INSUFFICIENT_PERMISSIONS",
                "You do not have permission to perform this action",
                "Na túto akciu nemáte oprávnenie",
            ),
            AppError::EmailDomainNotAllowed { allowed } => ErrorDetail::new(
                "EMAIL_DOMAIN_NOT_ALLOWED",
                format!("Only these email domains may sign in: {}", allowed.join(", ")),
                format!("Prihlásiť sa môžu len tieto domény: {}", allowed.join(", ")),
            )
            .with_field("email"),
            AppError::Validation {
                field,
                message,
                message_sk,
            } => ErrorDetail::new("VALIDATION_ERROR", message.clone(), message_sk.clone())
                .with_field(field),
            AppError::Conflict {
                resource,
                message,
                message_sk,
            } => ErrorDetail::new("CONFLICT", message.clone(), message_sk.clone())
                .with_field(resource),
            AppError::NotFound(resource) => ErrorDetail::new(
                "NOT_FOUND",
                format!("{} not found", resource),
                format!("{} sa nenašiel", resource),
            ),
            AppError::InsufficientStock {
                available,
                requested,
            } => ErrorDetail::new(
                "INSUFFICIENT_STOCK",
                format!(
                    "Insufficient stock: {} available, {} requested",
                    available, requested
                ),
                format!(
                    "Nedostatok tovaru na sklade: dostupné {}, požadované {}",
                    available, requested
                ),
            )
            .with_details(serde_json::json!({
                "available": available,
                "requested": requested,
            })),
            AppError::NoStock => ErrorDetail::new(
                "NO_STOCK",
                "Product is out of stock",
                "Produkt nie je na sklade",
            ),
            AppError::InvariantViolation(_) | AppError::Internal(_) => ErrorDetail::new(
                "INTERNAL_ERROR",
                "An internal server error occurred",
                "Nastala interná chyba servera",
            ),
            AppError::Email(_) => ErrorDetail::new(
                "EMAIL_ERROR",
                "Failed to send email, please try again",
                "Email sa nepodarilo odoslať, skúste to znova",
            ),
            AppError::Configuration(msg) => ErrorDetail::new(
                "CONFIGURATION_ERROR",
                format!("Configuration error: {}", msg),
                "Chyba konfigurácie servera",
            ),
            AppError::DatabaseError(_) => ErrorDetail::new(
                "DATABASE_ERROR",
                "A database error occurred",
                "Nastala chyba databázy",
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: self.detail() })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

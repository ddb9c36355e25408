//! Error handling for the Course Platform
//!
//! Every failure leaves the service as `{"error": "...", "code": "..."}` with
//! an HTTP status reflecting the failure class.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Validation errors
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    // External service errors
    #[error("Upstream error ({status}): {message}")]
    Upstream { status: StatusCode, message: String },

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: &'static str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code,
            field: None,
        }
    }
}

impl AppError {
    /// Shorthand for a field validation failure
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Validation { .. } | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidStateTransition(_) | AppError::InsufficientBalance(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Upstream { status, .. } => *status,
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            AppError::Configuration(_)
            | AppError::DatabaseError(_)
            | AppError::Internal(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            AppError::InvalidCredentials => {
                ErrorResponse::new("INVALID_CREDENTIALS", "Invalid email or password")
            }
            AppError::Unauthorized(msg) => ErrorResponse::new("UNAUTHORIZED", msg.clone()),
            AppError::Forbidden(msg) => ErrorResponse::new("FORBIDDEN", msg.clone()),
            AppError::Validation { field, message } => ErrorResponse {
                field: Some(field.clone()),
                ..ErrorResponse::new("VALIDATION_ERROR", message.clone())
            },
            AppError::BadRequest(msg) => ErrorResponse::new("BAD_REQUEST", msg.clone()),
            AppError::Conflict(msg) => ErrorResponse::new("CONFLICT", msg.clone()),
            AppError::NotFound(resource) => {
                ErrorResponse::new("NOT_FOUND", format!("{} not found", resource))
            }
            AppError::InvalidStateTransition(msg) => {
                ErrorResponse::new("INVALID_STATE_TRANSITION", msg.clone())
            }
            AppError::InsufficientBalance(msg) => {
                ErrorResponse::new("INSUFFICIENT_BALANCE", msg.clone())
            }
            AppError::Upstream { message, .. } => ErrorResponse::new("UPSTREAM_ERROR", message.clone()),
            AppError::ExternalService(msg) => {
                ErrorResponse::new("EXTERNAL_SERVICE_ERROR", msg.clone())
            }
            AppError::Configuration(msg) => ErrorResponse::new("CONFIGURATION_ERROR", msg.clone()),
            AppError::DatabaseError(_) => {
                ErrorResponse::new("DATABASE_ERROR", "A database error occurred")
            }
            AppError::Internal(_) | AppError::InternalError(_) => {
                ErrorResponse::new("INTERNAL_ERROR", "An internal server error occurred")
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(field, _)| *field);

        match fields.first() {
            Some((field, errs)) => {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                AppError::validation(field, message)
            }
            None => AppError::BadRequest("Invalid input".to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonSyntaxError(_) => AppError::BadRequest("Invalid JSON body".to_string()),
            JsonRejection::MissingJsonContentType(_) => {
                AppError::BadRequest("Expected a JSON body (Content-Type: application/json)".to_string())
            }
            other => AppError::BadRequest(other.body_text()),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
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

        (status, Json(self.body())).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

/// Whether a database error is a unique constraint violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

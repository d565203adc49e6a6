//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use feature_core::{ServingError, StoreError};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Resource errors
    NotFound(String),

    // Validation errors
    ValidationError(String),

    // Feature store unreachable or timing out
    ServiceUnavailable(String),

    // Database errors
    DatabaseError(String),

    // Generic errors
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.as_str()),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::ServiceUnavailable(msg) => {
                tracing::warn!("Feature store unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "Feature store unavailable")
            }
            AppError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error occurred")
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<ServingError> for AppError {
    fn from(err: ServingError) -> Self {
        match err {
            ServingError::Input(e) => AppError::ValidationError(e.to_string()),
            ServingError::NotFound(id) => AppError::NotFound(format!("entity {id} not found")),
            ServingError::Store(e @ StoreError::InvalidEntityId(_)) => AppError::ValidationError(e.to_string()),
            ServingError::Store(e) if e.is_transient() => AppError::ServiceUnavailable(e.to_string()),
            other => AppError::InternalError(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

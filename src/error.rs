use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Error returned by services and handlers; every variant maps to one HTTP status.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource already exists (duplicate email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Bad credentials or a missing/invalid/expired/revoked token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Requested AI provider has no API key configured.
    #[error("ai provider misconfigured: {0}")]
    ProviderMisconfigured(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ProviderMisconfigured(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::Validation(msg)
            | AppError::Conflict(msg)
            | AppError::Unauthorized(msg)
            | AppError::NotFound(msg) => json!({ "error": msg }),
            AppError::ProviderMisconfigured(detail) => json!({
                "error": "ai provider misconfigured",
                "detail": detail,
            }),
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                json!({ "error": "internal server error" })
            }
        };
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

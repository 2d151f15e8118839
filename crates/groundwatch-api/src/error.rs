//! Error type for the HTTP surface.
//!
//! [`ApiError`] is the single error every handler returns; its
//! [`IntoResponse`] impl maps each variant onto a status code and a JSON
//! body with a stable machine-readable `kind` next to the human-readable
//! `error` message. Storage failures are logged server-side and answered
//! with a generic message so internal details never reach clients.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use groundwatch_service::ServiceError;
use serde_json::json;
use tracing::error;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A request body failed field validation; carries per-field detail.
    #[error("validation failed")]
    Validation(#[from] validator::ValidationErrors),

    /// A path or query parameter is malformed or missing.
    #[error("{0}")]
    BadRequest(String),

    /// The addressed record does not exist.
    #[error("{0}")]
    NotFound(&'static str),

    /// The request is valid but collides with current state.
    #[error("{0}")]
    Conflict(String),

    /// The client is past its request budget for the current window.
    #[error("rate limited, retry in {retry_after_secs}s")]
    RateLimited {
        /// Whole seconds until the client's window resets.
        retry_after_secs: u64,
    },

    /// Something failed underneath; the detail is logged, not echoed.
    #[error("internal error")]
    Internal(String),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(what) => Self::NotFound(what),
            ServiceError::Conflict(message) => Self::Conflict(message),
            ServiceError::Store(source) => Self::Internal(source.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                axum::Json(json!({
                    "kind": "validation_error",
                    "error": "Validation failed",
                    "details": errors,
                })),
            )
                .into_response(),
            Self::BadRequest(message) => {
                plain(StatusCode::BAD_REQUEST, "validation_error", &message)
            }
            Self::NotFound(message) => plain(StatusCode::NOT_FOUND, "not_found", message),
            Self::Conflict(message) => plain(StatusCode::CONFLICT, "conflict", &message),
            Self::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after_secs.to_string())],
                axum::Json(json!({
                    "kind": "rate_limited",
                    "error": "Too many requests",
                    "retry_after_secs": retry_after_secs,
                })),
            )
                .into_response(),
            Self::Internal(detail) => {
                error!(error = %detail, "request failed on an internal error");
                plain(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "Internal server error",
                )
            }
        }
    }
}

/// Build a `{kind, error}` response body with the given status.
fn plain(status: StatusCode, kind: &str, message: &str) -> Response {
    (
        status,
        axum::Json(json!({
            "kind": kind,
            "error": message,
        })),
    )
        .into_response()
}

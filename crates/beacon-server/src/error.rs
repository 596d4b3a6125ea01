//! Request error type and its wire mapping.
//!
//! Every error response carries a stable machine-readable `error` kind plus
//! a human-readable `message`. Store internals are logged server-side and
//! never leak into the body.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use beacon_events::StoreError;

/// Per-request failure.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing, malformed, or mismatched credential. Terminal, no retry.
    #[error("invalid or missing API key")]
    Unauthorized,

    /// Malformed request; the message names the offending field.
    /// Terminal per request; the server never retries these.
    #[error("{0}")]
    Validation(String),

    /// Store failure. Transient contention was already retried inside the
    /// store; whatever reaches here is surfaced as a server-side error.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "invalid or missing API key".to_string(),
            ),
            Self::Validation(message) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_request", message)
            }
            Self::Store(err) if err.is_busy() => {
                error!(error = %err, "store contention exhausted retries");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "store_busy",
                    "store is busy, retry shortly".to_string(),
                )
            }
            Self::Store(err) => {
                error!(error = %err, "store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_string(),
                )
            }
        };

        (
            status,
            Json(serde_json::json!({
                "error": kind,
                "message": message,
            })),
        )
            .into_response()
    }
}

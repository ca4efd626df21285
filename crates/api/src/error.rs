use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use jojo_core::error::ScriptError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`ScriptError`] for core errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// An error from the script registry or execution engine.
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Script(err) => match err {
                ScriptError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
                ScriptError::Spawn { .. } => {
                    tracing::error!(error = %err, "Script could not be spawned");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "SPAWN_FAILED",
                        "The script could not be started".to_string(),
                    )
                }
                ScriptError::Timeout { .. } => {
                    tracing::warn!(error = %err, "Script killed after timeout");
                    (StatusCode::INTERNAL_SERVER_ERROR, "TIMEOUT", err.to_string())
                }
                ScriptError::Io(io) => {
                    tracing::error!(error = %io, "Script I/O error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

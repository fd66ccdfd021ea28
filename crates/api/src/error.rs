use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use jobrelay_core::error::CoreError;
use jobrelay_db::StoreError;
use serde_json::json;

use crate::engine::DispatchError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`StoreError`] and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `jobrelay_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A job store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The job could not be handed to the execution queue.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Core(e) => AppError::Core(e),
            DispatchError::Store(e) => AppError::Store(e),
            trigger @ DispatchError::Trigger { .. } => {
                AppError::ServiceUnavailable(trigger.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::UnknownJobType(job_type) => (
                    StatusCode::BAD_REQUEST,
                    "UNKNOWN_JOB_TYPE",
                    format!("Unknown job type: {job_type}"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
            },

            // --- Store errors ---
            AppError::Store(err) => classify_store_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::ServiceUnavailable(msg) => {
                tracing::error!(error = %msg, "Service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "The job was accepted but could not be queued; it will be retried".to_string(),
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

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Classify a store error into an HTTP status, error code, and message.
///
/// - `NotFound` maps to 404.
/// - Everything else maps to 500 with a sanitized message.
fn classify_store_error(err: &StoreError) -> (StatusCode, &'static str, String) {
    match err {
        StoreError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("Process with id {id} not found"),
        ),
        other => {
            tracing::error!(error = %other, "Job store error");
            internal()
        }
    }
}

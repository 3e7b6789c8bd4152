use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use synthgate_core::error::{CoreError, StoreError};

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `synthgate_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The lock or job store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The accelerator is held by another job. Clients should retry later.
    #[error("Hardware busy")]
    HardwareBusy,

    /// The job could not be queued after admission; the lock was released.
    #[error("Dispatch failed: {0}")]
    DispatchFailed(String),

    /// The subject analyzer failed.
    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

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
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Store errors ---
            AppError::Store(err) => {
                tracing::error!(error = %err, "Store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::HardwareBusy => (
                StatusCode::TOO_MANY_REQUESTS,
                "HARDWARE_BUSY",
                "error_hardware_busy".to_string(),
            ),
            AppError::DispatchFailed(msg) => {
                tracing::error!(error = %msg, "Dispatch failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DISPATCH_FAILED",
                    "error_dispatch_failed".to_string(),
                )
            }
            AppError::AnalysisFailed(msg) => {
                tracing::error!(error = %msg, "Analysis failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "ANALYSIS_FAILED",
                    "error_analysis_failed".to_string(),
                )
            }
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

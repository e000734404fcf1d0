use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use koma_core::error::CoreError;

use crate::storage::StorageError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`StorageError`] for the file
/// store. Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `koma_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A failure reading or writing page documents.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Storage(err) => classify_storage_error(err),
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

fn classify_core_error(core: &CoreError) -> (StatusCode, &'static str, String) {
    match core {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            internal()
        }
    }
}

/// Classify a storage error into an HTTP status, error code, and message.
///
/// - Domain errors raised by the store keep their usual mapping.
/// - A JSON document that no longer parses maps to 500 with the file left
///   untouched.
/// - I/O and image decoding failures map to 500 with a sanitized message.
fn classify_storage_error(err: &StorageError) -> (StatusCode, &'static str, String) {
    match err {
        StorageError::Core(core) => classify_core_error(core),
        StorageError::Json(json_err) => {
            tracing::error!(error = %json_err, "Malformed page document");
            internal()
        }
        StorageError::Io(io_err) => {
            tracing::error!(error = %io_err, "Storage I/O error");
            internal()
        }
        StorageError::Image(img_err) => {
            tracing::error!(error = %img_err, "Image read error");
            internal()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_from_storage_is_404() {
        let err = AppError::from(StorageError::from(CoreError::NotFound {
            entity: "Page",
            id: "00001".into(),
        }));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_is_400() {
        let err = AppError::from(CoreError::Validation("bad box".into()));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn io_failures_are_500() {
        let err = AppError::from(StorageError::from(std::io::Error::other("disk")));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

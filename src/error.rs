//! Error types for the state services
//!
//! `StoreError` is what request handlers see. `SnapshotError` stays inside the
//! snapshot manager, which logs it and carries on.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Store Error Enum ==
/// Errors surfaced by store operations to the HTTP layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Key absent or expired
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Rejected input, state unchanged
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = match &self {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            StoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Snapshot Error Enum ==
/// Failures while reading, parsing, applying or writing a snapshot file.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Filesystem failure
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// File content is not a valid JSON image
    #[error("snapshot could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),

    /// Image parsed but holds values the store cannot accept
    #[error("snapshot rejected: {0}")]
    Invalid(String),
}

// == Result Type Alias ==
/// Convenience Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_error_status_codes() {
        let test_cases = vec![
            (StoreError::NotFound("key".to_string()), StatusCode::NOT_FOUND),
            (
                StoreError::InvalidArgument("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                StoreError::Internal("error".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected_status) in test_cases {
            let response = error.into_response();
            assert_eq!(response.status(), expected_status);
        }
    }

    #[tokio::test]
    async fn test_error_body_has_error_field() {
        let error = StoreError::InvalidArgument("delta must be >= 0".to_string());
        let response = error.into_response();

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.contains("application/json"));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["error"], "Invalid argument: delta must be >= 0");
    }

    #[test]
    fn test_snapshot_error_from_parse() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: SnapshotError = parse.into();
        assert!(matches!(err, SnapshotError::Parse(_)));
    }
}

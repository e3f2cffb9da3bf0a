//! HTTP error responses.
//!
//! Every failing handler returns an [`ApiErrorResponse`]: a status code
//! plus an [`ErrorBody`] with a stable machine-readable code.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use letsfocus_proto::api::ErrorBody;

use crate::reorder::ReorderError;
use crate::store::StoreError;

/// API error response containing status code and error details.
#[derive(Debug, Clone)]
pub struct ApiErrorResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Error details.
    pub error: ErrorBody,
}

impl ApiErrorResponse {
    /// Creates a new API error response.
    #[must_use]
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            error: ErrorBody {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }

    /// 401: no valid session.
    #[must_use]
    pub fn unauthenticated() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "UNAUTHENTICATED",
            "a valid session is required",
        )
    }

    /// 400: the request is malformed or inconsistent.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message)
    }

    /// 404: a referenced task does not exist.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// 409: the list changed underneath the request.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "CONFLICT", message)
    }

    /// 500: the store write failed. Details stay in the log.
    #[must_use]
    pub fn persistence_failure() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "PERSISTENCE_FAILURE",
            "the change could not be saved",
        )
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<StoreError> for ApiErrorResponse {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(id) => Self::not_found(format!("task not found: {id}")),
            StoreError::Inactive(_) => Self::invalid_request(error.to_string()),
            StoreError::Conflict(_) => Self::conflict(error.to_string()),
            StoreError::Snapshot(_) | StoreError::Io { .. } => {
                tracing::error!(error = %error, "task store write failed");
                Self::persistence_failure()
            }
        }
    }
}

impl From<ReorderError> for ApiErrorResponse {
    fn from(error: ReorderError) -> Self {
        match error {
            ReorderError::InvalidRequest(message) => Self::invalid_request(message),
            ReorderError::NotFound(id) => Self::not_found(format!("task not found: {id}")),
            ReorderError::Conflict => Self::conflict(error.to_string()),
            ReorderError::Store(inner) => inner.into(),
        }
    }
}

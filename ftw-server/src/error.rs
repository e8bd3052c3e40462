//! Error types for ftw-server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or invalid admin signature (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Not permitted for this record (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Conflict (409), e.g. a verdict that was already recorded
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Upstream service failed (502)
    #[error("Upstream failure: {0}")]
    BadGateway(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// ftw-common error
    #[error(transparent)]
    Common(#[from] ftw_common::Error),
}

impl ApiError {
    fn parts(self) -> (StatusCode, &'static str, String) {
        use ftw_common::Error as CommonError;

        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "BAD_GATEWAY", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Common(err) => match err {
                CommonError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
                CommonError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
                CommonError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
                CommonError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
                other => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    other.to_string(),
                ),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = self.parts();

        if status.is_server_error() {
            error!(code = error_code, "{}", message);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

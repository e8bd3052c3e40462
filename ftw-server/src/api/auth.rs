//! Admin authentication middleware
//!
//! Admin requests are signed with the shared secret (see
//! [`ftw_common::api::auth`]). JSON bodies carry `timestamp` and `hash`
//! fields. Requests without a body, such as `DELETE /api/notary`, carry them as
//! query parameters and the hash covers `{"hash": ..., "timestamp": ...}`.

use axum::{
    body::Body,
    extract::{Query, Request, State},
    middleware::Next,
    response::Response,
};
use ftw_common::api::{validate_hash, validate_timestamp, ApiAuthError};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

/// Largest admin body accepted
pub const MAX_AUTH_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Default, Deserialize)]
struct AuthFields {
    timestamp: Option<i64>,
    hash: Option<String>,
}

/// Validate the admin signature, then pass the untouched request on
///
/// A shared secret of 0 disables checking.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.shared_secret == 0 {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, MAX_AUTH_BODY_BYTES)
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read body: {}", e)))?;

    let signed: Value = if body_bytes.iter().all(|b| b.is_ascii_whitespace()) {
        let Query(fields) = Query::<AuthFields>::try_from_uri(&parts.uri)
            .map_err(|e| ApiError::BadRequest(format!("Invalid query: {}", e)))?;
        json!({ "timestamp": fields.timestamp, "hash": fields.hash })
    } else {
        serde_json::from_slice(&body_bytes)
            .map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {}", e)))?
    };

    let fields: AuthFields = serde_json::from_value(signed.clone())
        .map_err(|e| ApiError::BadRequest(format!("Invalid auth fields: {}", e)))?;
    let timestamp = fields
        .timestamp
        .ok_or_else(|| ApiError::BadRequest(ApiAuthError::MissingTimestamp.to_string()))?;
    let hash = fields
        .hash
        .ok_or_else(|| ApiError::BadRequest(ApiAuthError::MissingHash.to_string()))?;

    validate_timestamp(timestamp, state.auth_window)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    validate_hash(&hash, &signed, state.shared_secret).map_err(|e| {
        if let ApiAuthError::InvalidHash { provided, .. } = &e {
            warn!(path = %parts.uri.path(), provided = %provided, "Admin hash validation failed");
        }
        ApiError::Unauthorized(e.to_string())
    })?;

    let request = Request::from_parts(parts, Body::from(body_bytes));
    Ok(next.run(request).await)
}

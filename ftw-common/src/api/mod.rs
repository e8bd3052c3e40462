//! Shared HTTP API functionality
//!
//! Framework-free pieces only: request signing and the shared secret. The
//! server wraps these in axum middleware.

pub mod auth;

pub use auth::{
    initialize_shared_secret, load_shared_secret, sign_request, validate_hash,
    validate_timestamp, ApiAuthError, AuthWindow,
};

//! Admin request signing
//!
//! Admin requests carry `timestamp` (Unix epoch ms) and `hash` fields. The
//! hash is computed as follows:
//!
//! 1. Replace the `hash` field with 64 zeros
//! 2. Serialize to canonical JSON (sorted keys, no whitespace)
//! 3. Append the shared secret as a decimal i64
//! 4. SHA-256, rendered as 64 lowercase hex characters
//!
//! A shared secret of `0` disables checking entirely.

use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

use crate::time;

/// Settings key holding the admin shared secret
pub const SHARED_SECRET_KEY: &str = "admin_shared_secret";

/// Placeholder substituted for the hash before hashing
pub const DUMMY_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Allowed clock skew for timestamps in the future
pub const MAX_FUTURE_SKEW_MS: i64 = 1_000;

#[derive(Debug, Clone, PartialEq)]
pub enum ApiAuthError {
    /// Timestamp outside acceptable window
    InvalidTimestamp { timestamp: i64, now: i64, reason: String },

    /// Hash does not match calculated value
    InvalidHash { provided: String, calculated: String },

    MissingTimestamp,
    MissingHash,

    /// Database error loading shared secret
    DatabaseError(String),
}

impl std::fmt::Display for ApiAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiAuthError::InvalidTimestamp { reason, .. } => {
                write!(f, "Invalid timestamp: {}", reason)
            }
            ApiAuthError::InvalidHash { .. } => write!(f, "Invalid hash"),
            ApiAuthError::MissingTimestamp => write!(f, "Missing timestamp field"),
            ApiAuthError::MissingHash => write!(f, "Missing hash field"),
            ApiAuthError::DatabaseError(err) => write!(f, "Database error: {}", err),
        }
    }
}

impl std::error::Error for ApiAuthError {}

/// Acceptance window for request timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthWindow {
    pub max_past_ms: i64,
    pub max_future_ms: i64,
}

impl AuthWindow {
    pub fn new(max_past_ms: i64) -> Self {
        Self {
            max_past_ms,
            max_future_ms: MAX_FUTURE_SKEW_MS,
        }
    }
}

/// Load the admin shared secret, generating one on first use
pub async fn load_shared_secret(db: &SqlitePool) -> Result<i64, ApiAuthError> {
    let stored: Option<String> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(SHARED_SECRET_KEY)
            .fetch_optional(db)
            .await
            .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;

    match stored {
        Some(value) => value
            .trim()
            .parse::<i64>()
            .map_err(|e| ApiAuthError::DatabaseError(format!("Invalid shared secret: {}", e))),
        None => initialize_shared_secret(db).await,
    }
}

/// Generate and store a random non-zero shared secret
pub async fn initialize_shared_secret(db: &SqlitePool) -> Result<i64, ApiAuthError> {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    let secret: i64 = loop {
        let val = rng.gen::<i64>();
        if val != 0 {
            break val;
        }
    };

    // A concurrent initializer may have won; keep whichever value landed.
    sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(SHARED_SECRET_KEY)
        .bind(secret.to_string())
        .execute(db)
        .await
        .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;

    let stored: String = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(SHARED_SECRET_KEY)
        .fetch_one(db)
        .await
        .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;

    stored
        .parse::<i64>()
        .map_err(|e| ApiAuthError::DatabaseError(format!("Invalid shared secret: {}", e)))
}

/// Check a request timestamp against the window, relative to `now` (ms)
pub fn validate_timestamp_at(
    timestamp: i64,
    now: i64,
    window: AuthWindow,
) -> Result<(), ApiAuthError> {
    let Some(age) = now.checked_sub(timestamp) else {
        return Err(ApiAuthError::InvalidTimestamp {
            timestamp,
            now,
            reason: format!("Timestamp {} out of range", timestamp),
        });
    };

    if age > window.max_past_ms {
        return Err(ApiAuthError::InvalidTimestamp {
            timestamp,
            now,
            reason: format!("Timestamp {}ms too old (max {}ms)", age, window.max_past_ms),
        });
    }

    if age.saturating_neg() > window.max_future_ms {
        return Err(ApiAuthError::InvalidTimestamp {
            timestamp,
            now,
            reason: format!(
                "Timestamp {}ms in future (max {}ms)",
                age.saturating_neg(),
                window.max_future_ms
            ),
        });
    }

    Ok(())
}

/// Check a request timestamp against the window, relative to the clock
pub fn validate_timestamp(timestamp: i64, window: AuthWindow) -> Result<(), ApiAuthError> {
    validate_timestamp_at(timestamp, time::now_millis(), window)
}

/// Compute the hash a request body must carry
pub fn sign_request(body: &Value, shared_secret: i64) -> String {
    let mut value = body.clone();
    if let Some(obj) = value.as_object_mut() {
        obj.insert("hash".to_string(), Value::String(DUMMY_HASH.to_string()));
    }

    let mut hasher = Sha256::new();
    hasher.update(to_canonical_json(&value).as_bytes());
    hasher.update(shared_secret.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compare a provided hash against the expected one
pub fn validate_hash(
    provided_hash: &str,
    body: &Value,
    shared_secret: i64,
) -> Result<(), ApiAuthError> {
    let calculated = sign_request(body, shared_secret);
    if !provided_hash.eq_ignore_ascii_case(&calculated) {
        return Err(ApiAuthError::InvalidHash {
            provided: provided_hash.to_string(),
            calculated,
        });
    }
    Ok(())
}

/// Serialize with keys sorted at every level and no whitespace
///
/// Strings go through serde_json's escaper so control characters and
/// quotes are encoded the same way on both ends.
pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|k| {
                    format!(
                        "{}:{}",
                        Value::String(k.clone()),
                        to_canonical_json(&map[k])
                    )
                })
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(to_canonical_json).collect();
            format!("[{}]", parts.join(","))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const WINDOW: AuthWindow = AuthWindow {
        max_past_ms: 30_000,
        max_future_ms: MAX_FUTURE_SKEW_MS,
    };

    #[test]
    fn test_timestamp_window_edges() {
        let now = 1_760_000_000_000;
        assert!(validate_timestamp_at(now, now, WINDOW).is_ok());
        assert!(validate_timestamp_at(now - 30_000, now, WINDOW).is_ok());
        assert!(validate_timestamp_at(now - 30_001, now, WINDOW).is_err());
        assert!(validate_timestamp_at(now + 1_000, now, WINDOW).is_ok());
        assert!(validate_timestamp_at(now + 1_001, now, WINDOW).is_err());
    }

    #[test]
    fn test_extreme_timestamps_are_rejected_without_overflow() {
        let now = 1_760_000_000_000;
        for timestamp in [i64::MIN, i64::MIN + 1, i64::MAX, -now] {
            let err = validate_timestamp_at(timestamp, now, WINDOW).unwrap_err();
            assert!(matches!(err, ApiAuthError::InvalidTimestamp { .. }), "{}", timestamp);
        }
        assert!(validate_timestamp_at(i64::MAX, i64::MIN, WINDOW).is_err());
    }

    #[test]
    fn test_canonical_json_sorts_nested_keys() {
        let value = json!({"z": 1, "a": {"y": [true, null], "b": "q\"uote"}});
        assert_eq!(
            to_canonical_json(&value),
            r#"{"a":{"b":"q\"uote","y":[true,null]},"z":1}"#
        );
    }

    #[test]
    fn test_signature_ignores_supplied_hash_and_key_order() {
        let secret = 987_654_321;
        let a = json!({"ban_id": "b1", "verdict": "upheld", "timestamp": 5, "hash": "anything"});
        let b = json!({"timestamp": 5, "verdict": "upheld", "hash": "else", "ban_id": "b1"});
        assert_eq!(sign_request(&a, secret), sign_request(&b, secret));
        assert_eq!(sign_request(&a, secret).len(), 64);
    }

    #[test]
    fn test_signature_depends_on_secret_and_body() {
        let body = json!({"verdict": "upheld", "timestamp": 5});
        let sig = sign_request(&body, 42);
        assert_ne!(sig, sign_request(&body, 43));
        assert_ne!(sig, sign_request(&json!({"verdict": "lifted", "timestamp": 5}), 42));
    }

    #[test]
    fn test_validate_hash() {
        let body = json!({"appeal_id": "a1", "verdict": "granted", "timestamp": 9});
        let sig = sign_request(&body, 7);
        assert!(validate_hash(&sig, &body, 7).is_ok());
        assert!(validate_hash(&sig.to_uppercase(), &body, 7).is_ok());
        assert!(matches!(
            validate_hash(DUMMY_HASH, &body, 7),
            Err(ApiAuthError::InvalidHash { .. })
        ));
    }
}

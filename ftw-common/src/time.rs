//! Timestamp utilities
//!
//! All timestamps are stored as RFC 3339 text in UTC with millisecond
//! precision so that lexical order in SQLite matches chronological order.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{Error, Result};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp in the stored form
pub fn to_stored(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time in the stored form
pub fn now_stored() -> String {
    to_stored(now())
}

/// Parse a client-supplied RFC 3339 timestamp (any offset) into UTC
pub fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidInput(format!("Invalid timestamp '{}': {}", s, e)))
}

/// Current Unix epoch time in milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_stored_form_is_utc_millis() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(to_stored(ts), "2025-03-01T12:30:05.000Z");
    }

    #[test]
    fn test_stored_form_sorts_chronologically() {
        let a = to_stored(Utc.with_ymd_and_hms(2025, 1, 9, 0, 0, 0).unwrap());
        let b = to_stored(Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap());
        assert!(a < b);
    }

    #[test]
    fn test_parse_normalizes_offset() {
        let dt = parse_rfc3339("2025-03-01T14:30:05+02:00").unwrap();
        assert_eq!(to_stored(dt), "2025-03-01T12:30:05.000Z");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_rfc3339("next tuesday"), Err(Error::InvalidInput(_))));
    }
}

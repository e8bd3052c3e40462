//! UUID utilities

use uuid::Uuid;

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Generate a new record id in its stored (hyphenated) form
pub fn new_id() -> String {
    generate().to_string()
}

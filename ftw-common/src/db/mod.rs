//! Database models and queries

pub mod drops;
pub mod earnings;
pub mod init;
pub mod models;
pub mod moderation;
pub mod profiles;
pub mod retry;
pub mod users;

pub use init::*;
pub use models::*;
pub use retry::retry_on_lock;

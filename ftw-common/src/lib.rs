//! # FTW Common Library
//!
//! Shared code for the ForTheWeebs ledger service:
//! - Tier tables and earnings splits
//! - Governance ledger (hash chain) and event notary
//! - Database schema, records and queries
//! - Payment routing rules
//! - Configuration loading
//! - Admin request signing

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod payments;
pub mod tiers;
pub mod time;
pub mod uuid_utils;
pub mod vault;

pub use error::{Error, Result};

//! Append-only ledgers
//!
//! - [`governance`]: hash-chained record of administrative decisions,
//!   persisted as a JSON document
//! - [`notary`]: bounded in-memory log of policy and system events

pub mod governance;
pub mod notary;

pub use governance::{GovernanceLedger, IntegrityReport, LedgerEntry, GENESIS_PREV_HASH};
pub use notary::{EventNotary, NotaryEntry, NotaryEvent, NotaryFilter, NotaryStats};

//! Governance ledger
//!
//! Each entry's hash is `sha256("{version}:{action}:{actor}:{justification}:{prev_hash}")`
//! rendered as lowercase hex, and `prev_hash` is the hash of the previous
//! entry (`"0"` for the first one). The chain is tamper-evident, not signed:
//! anyone able to rewrite the file can recompute every hash.
//!
//! The timestamp is metadata and is not part of the hash.
//!
//! Persistence writes the whole document to a sibling temp file and renames
//! it over the target, so a crash mid-write leaves the previous version in
//! place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{time, Error, Result};

/// `prev_hash` of the first entry
pub const GENESIS_PREV_HASH: &str = "0";

/// One inscribed governance action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub version: u64,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub actor: String,
    pub justification: String,
    pub prev_hash: String,
    pub hash: String,
}

/// Result of [`GovernanceLedger::verify_integrity`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub valid: bool,
    /// Index of the first entry that fails verification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tampered: Option<usize>,
}

impl IntegrityReport {
    fn ok() -> Self {
        Self {
            valid: true,
            tampered: None,
        }
    }

    fn tampered_at(index: usize) -> Self {
        Self {
            valid: false,
            tampered: Some(index),
        }
    }
}

/// On-disk document
#[derive(Debug, Serialize, Deserialize)]
struct LedgerDocument {
    version: u64,
    ledger: Vec<LedgerEntry>,
    #[serde(rename = "lastUpdated")]
    last_updated: DateTime<Utc>,
}

/// Hash for an entry with the given fields
pub fn entry_hash(
    version: u64,
    action: &str,
    actor: &str,
    justification: &str,
    prev_hash: &str,
) -> String {
    let data = format!("{}:{}:{}:{}:{}", version, action, actor, justification, prev_hash);
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hash-chained governance ledger
#[derive(Debug, Default)]
pub struct GovernanceLedger {
    version: u64,
    entries: Vec<LedgerEntry>,
    path: Option<PathBuf>,
}

impl GovernanceLedger {
    /// Ledger that is never written to disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the ledger stored at `path`, or start an empty one if the file
    /// does not exist yet
    ///
    /// An unreadable or unparseable file is an error rather than a fresh
    /// start, so a damaged ledger is never silently overwritten.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let doc: LedgerDocument = serde_json::from_str(&content)?;
                info!(
                    entries = doc.ledger.len(),
                    version = doc.version,
                    "Loaded governance ledger from {}",
                    path.display()
                );
                Ok(Self {
                    version: doc.version,
                    entries: doc.ledger,
                    path: Some(path),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No governance ledger at {}, starting empty", path.display());
                Ok(Self {
                    version: 0,
                    entries: Vec::new(),
                    path: Some(path),
                })
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn head_hash(&self) -> &str {
        self.entries
            .last()
            .map(|e| e.hash.as_str())
            .unwrap_or(GENESIS_PREV_HASH)
    }

    /// Append an entry in memory only
    pub fn inscribe(&mut self, action: &str, actor: &str, justification: &str) -> LedgerEntry {
        let version = self.version + 1;
        let prev_hash = self.head_hash().to_string();
        let entry = LedgerEntry {
            version,
            timestamp: time::now(),
            action: action.to_string(),
            actor: actor.to_string(),
            justification: justification.to_string(),
            hash: entry_hash(version, action, actor, justification, &prev_hash),
            prev_hash,
        };

        self.version = version;
        self.entries.push(entry.clone());
        entry
    }

    /// Drop the newest entry if it is `version`
    ///
    /// Only for entries appended with [`Self::inscribe`] that were never
    /// saved.
    pub fn discard(&mut self, version: u64) -> Option<LedgerEntry> {
        if self.entries.last().map(|e| e.version) != Some(version) {
            return None;
        }
        self.version -= 1;
        self.entries.pop()
    }

    /// Append an entry and persist the ledger before returning
    ///
    /// If the write fails the entry is removed again, so memory never runs
    /// ahead of disk.
    pub async fn inscribe_persisted(
        &mut self,
        action: &str,
        actor: &str,
        justification: &str,
    ) -> Result<LedgerEntry> {
        let entry = self.inscribe(action, actor, justification);
        if let Err(e) = self.save().await {
            self.discard(entry.version);
            return Err(e);
        }
        debug!(version = entry.version, action = %entry.action, "Inscribed governance entry");
        Ok(entry)
    }

    /// Write the ledger document to its path (no-op for in-memory ledgers)
    pub async fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let doc = LedgerDocument {
            version: self.version,
            ledger: self.entries.clone(),
            last_updated: time::now(),
        };
        let json = serde_json::to_vec_pretty(&doc)?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Walk the chain recomputing hashes
    ///
    /// Entry `i` fails when its stored `prev_hash` does not match entry
    /// `i - 1`'s stored hash, or when its stored hash does not match the
    /// hash recomputed from its fields.
    pub fn verify_integrity(&self) -> IntegrityReport {
        verify_entries(&self.entries)
    }

    #[cfg(test)]
    fn entries_mut(&mut self) -> &mut Vec<LedgerEntry> {
        &mut self.entries
    }
}

/// Verify a chain of entries independent of any ledger instance
pub fn verify_entries(entries: &[LedgerEntry]) -> IntegrityReport {
    for (i, entry) in entries.iter().enumerate() {
        let prev_hash = if i > 0 {
            entries[i - 1].hash.as_str()
        } else {
            GENESIS_PREV_HASH
        };

        if entry.prev_hash != prev_hash {
            return IntegrityReport::tampered_at(i);
        }

        let expected = entry_hash(
            entry.version,
            &entry.action,
            &entry.actor,
            &entry.justification,
            prev_hash,
        );
        if entry.hash != expected {
            return IntegrityReport::tampered_at(i);
        }
    }
    IntegrityReport::ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_entry_ledger() -> GovernanceLedger {
        let mut ledger = GovernanceLedger::in_memory();
        ledger.inscribe("ban_verdict", "council", "repeated spam");
        ledger.inscribe("policy_change", "owner", "raise upload limit");
        ledger.inscribe("appeal_verdict", "council", "evidence reviewed");
        ledger
    }

    #[test]
    fn test_hash_format_is_colon_joined_sha256() {
        // sha256("1:a:b:c:0")
        let hash = entry_hash(1, "a", "b", "c", "0");
        assert_eq!(
            hash,
            "c08170e92699cdec3a33529573b844367ac36a364e27b3d6ad9a3963e29dec04"
        );
        assert_ne!(hash, entry_hash(2, "a", "b", "c", "0"));
    }

    #[test]
    fn test_discard_only_drops_the_newest_entry() {
        let mut ledger = three_entry_ledger();

        assert!(ledger.discard(2).is_none());
        assert_eq!(ledger.len(), 3);

        let dropped = ledger.discard(3).unwrap();
        assert_eq!(dropped.action, "appeal_verdict");
        assert_eq!(ledger.version(), 2);

        let next = ledger.inscribe("ban_verdict", "council", "retry");
        assert_eq!(next.version, 3);
        assert_eq!(next.prev_hash, ledger.entries()[1].hash);
        assert_eq!(ledger.verify_integrity(), IntegrityReport::ok());
    }

    #[test]
    fn test_chain_links_entries() {
        let ledger = three_entry_ledger();
        let entries = ledger.entries();

        assert_eq!(entries[0].prev_hash, GENESIS_PREV_HASH);
        assert_eq!(entries[1].prev_hash, entries[0].hash);
        assert_eq!(entries[2].prev_hash, entries[1].hash);
        assert_eq!(entries.iter().map(|e| e.version).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(ledger.version(), 3);
    }

    #[test]
    fn test_untouched_ledger_verifies() {
        assert_eq!(three_entry_ledger().verify_integrity(), IntegrityReport::ok());
        assert_eq!(GovernanceLedger::in_memory().verify_integrity(), IntegrityReport::ok());
    }

    #[test]
    fn test_mutated_justification_flags_that_entry() {
        let mut ledger = three_entry_ledger();
        ledger.entries_mut()[1].justification = "lower upload limit".to_string();

        let report = ledger.verify_integrity();
        assert!(!report.valid);
        assert_eq!(report.tampered, Some(1));
    }

    #[test]
    fn test_each_hashed_field_is_covered() {
        let mutations: [fn(&mut LedgerEntry); 6] = [
            |e| e.version += 10,
            |e| e.action.push('!'),
            |e| e.actor = "mallory".to_string(),
            |e| e.justification.clear(),
            |e| e.prev_hash = "f".repeat(64),
            |e| e.hash = "0".repeat(64),
        ];

        for mutate in mutations {
            for index in 0..3 {
                let mut ledger = three_entry_ledger();
                mutate(&mut ledger.entries_mut()[index]);
                assert_eq!(
                    ledger.verify_integrity(),
                    IntegrityReport::tampered_at(index),
                    "mutation at entry {} not detected",
                    index
                );
            }
        }
    }

    #[test]
    fn test_removed_entry_breaks_the_chain() {
        let mut ledger = three_entry_ledger();
        ledger.entries_mut().remove(1);
        assert_eq!(ledger.verify_integrity(), IntegrityReport::tampered_at(1));
    }

    #[test]
    fn test_report_serializes_like_the_http_response() {
        let ok = serde_json::to_value(IntegrityReport::ok()).unwrap();
        assert_eq!(ok, serde_json::json!({"valid": true}));

        let bad = serde_json::to_value(IntegrityReport::tampered_at(4)).unwrap();
        assert_eq!(bad, serde_json::json!({"valid": false, "tampered": 4}));
    }

    #[tokio::test]
    async fn test_persisted_ledger_reloads_and_continues_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifacts").join("governance-ledger.json");

        {
            let mut ledger = GovernanceLedger::load(&path).await.unwrap();
            assert!(ledger.is_empty());
            ledger.inscribe_persisted("ban_verdict", "council", "spam").await.unwrap();
            ledger.inscribe_persisted("policy_change", "owner", "limits").await.unwrap();
        }

        let mut reloaded = GovernanceLedger::load(&path).await.unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.version(), 2);
        assert!(reloaded.verify_integrity().valid);

        let third = reloaded.inscribe_persisted("audit", "owner", "quarterly").await.unwrap();
        assert_eq!(third.version, 3);
        assert_eq!(third.prev_hash, reloaded.entries()[1].hash);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["version"], 3);
        assert_eq!(raw["ledger"].as_array().unwrap().len(), 3);
        assert!(raw["lastUpdated"].is_string());
    }

    #[tokio::test]
    async fn test_tampered_file_is_detected_after_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("governance-ledger.json");

        let mut ledger = GovernanceLedger::load(&path).await.unwrap();
        ledger.inscribe_persisted("ban_verdict", "council", "spam").await.unwrap();
        ledger.inscribe_persisted("ban_verdict", "council", "fraud").await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, content.replace("fraud", "nothing")).unwrap();

        let reloaded = GovernanceLedger::load(&path).await.unwrap();
        assert_eq!(reloaded.verify_integrity(), IntegrityReport::tampered_at(1));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("governance-ledger.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            GovernanceLedger::load(&path).await,
            Err(Error::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        let mut ledger = GovernanceLedger::load(&path).await.unwrap();
        ledger.inscribe_persisted("x", "y", "z").await.unwrap();

        // A non-empty directory where the file should be makes the rename fail.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir_all(path.join("occupied")).unwrap();

        let result = ledger.inscribe_persisted("x2", "y2", "z2").await;
        assert!(result.is_err());
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.version(), 1);
    }
}

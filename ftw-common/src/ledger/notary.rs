//! Event notary
//!
//! Unchained record of policy changes and system events. Entries live in
//! memory only; once the capacity is reached the oldest entry is dropped for
//! every new one. Ids keep increasing across drops and clears.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, VecDeque};

use crate::time;

/// Default number of entries kept in memory
pub const DEFAULT_NOTARY_CAPACITY: usize = 10_000;

/// Event submitted for recording
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotaryEvent {
    /// Defaults to `"system"`
    pub actor: Option<String>,
    pub command: String,
    pub key: Option<String>,
    pub value: Option<Value>,
    pub old_value: Option<Value>,
    pub version: Option<i64>,
    pub metadata: Option<Value>,
}

impl NotaryEvent {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn old_value(mut self, value: Value) -> Self {
        self.old_value = Some(value);
        self
    }
}

/// Recorded event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotaryEntry {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub command: String,
    pub key: Option<String>,
    pub value: Option<Value>,
    pub old_value: Option<Value>,
    pub version: Option<i64>,
    pub metadata: Value,
}

/// Query filters; all present filters must match
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotaryFilter {
    pub actor: Option<String>,
    pub command: Option<String>,
    pub key: Option<String>,
    /// Keep only the newest `limit` matches
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotaryStats {
    pub total_entries: usize,
    pub unique_actors: usize,
    pub unique_commands: usize,
    pub actors: Vec<String>,
    pub commands: Vec<String>,
    pub oldest_entry: Option<NotaryEntry>,
    pub newest_entry: Option<NotaryEntry>,
}

#[derive(Debug)]
pub struct EventNotary {
    entries: VecDeque<NotaryEntry>,
    capacity: usize,
    next_id: u64,
}

impl Default for EventNotary {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_NOTARY_CAPACITY)
    }
}

impl EventNotary {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            next_id: 1,
        }
    }

    pub fn record(&mut self, event: NotaryEvent) -> NotaryEntry {
        let entry = NotaryEntry {
            id: self.next_id,
            timestamp: time::now(),
            actor: event.actor.unwrap_or_else(|| "system".to_string()),
            command: event.command,
            key: event.key,
            value: event.value,
            old_value: event.old_value,
            version: event.version,
            metadata: event.metadata.unwrap_or_else(|| Value::Object(Default::default())),
        };
        self.next_id += 1;

        self.entries.push_back(entry.clone());
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        entry
    }

    pub fn query(&self, filter: &NotaryFilter) -> Vec<NotaryEntry> {
        let matches: Vec<&NotaryEntry> = self
            .entries
            .iter()
            .filter(|e| filter.actor.as_ref().map_or(true, |a| &e.actor == a))
            .filter(|e| filter.command.as_ref().map_or(true, |c| &e.command == c))
            .filter(|e| filter.key.as_ref().map_or(true, |k| e.key.as_ref() == Some(k)))
            .collect();

        let skip = match filter.limit {
            Some(limit) => matches.len().saturating_sub(limit),
            None => 0,
        };
        matches.into_iter().skip(skip).cloned().collect()
    }

    pub fn stats(&self) -> NotaryStats {
        let actors: BTreeSet<&str> = self.entries.iter().map(|e| e.actor.as_str()).collect();
        let commands: BTreeSet<&str> = self.entries.iter().map(|e| e.command.as_str()).collect();

        NotaryStats {
            total_entries: self.entries.len(),
            unique_actors: actors.len(),
            unique_commands: commands.len(),
            actors: actors.into_iter().map(String::from).collect(),
            commands: commands.into_iter().map(String::from).collect(),
            oldest_entry: self.entries.front().cloned(),
            newest_entry: self.entries.back().cloned(),
        }
    }

    /// Drop every entry, returning how many were dropped
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

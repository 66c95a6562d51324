//! Analysis history.
//!
//! Completed analyses are appended to a log that can be listed newest-first
//! and pruned by id. The analyze flow treats every store error as a warning.

mod jsonl;

pub use jsonl::JsonlHistoryStore;

use crate::error::PersistenceError;
use crate::models::{CombinedResult, FileInfo};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// A stored analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub file: FileInfo,
    pub result: CombinedResult,
}

impl HistoryRecord {
    /// Stamp a new record with a fresh id and the current time.
    pub fn new(file: FileInfo, result: CombinedResult) -> Self {
        Self {
            id: Ulid::new().to_string(),
            created_at: Utc::now(),
            file,
            result,
        }
    }
}

/// Append-only store of analyses.
pub trait HistoryStore {
    /// Persist a record and return it as stored.
    fn insert(&self, record: HistoryRecord) -> Result<HistoryRecord, PersistenceError>;

    /// Up to `limit` records, newest first.
    fn list(&self, limit: usize) -> Result<Vec<HistoryRecord>, PersistenceError>;

    /// Look up a record by id.
    fn get(&self, id: &str) -> Result<Option<HistoryRecord>, PersistenceError> {
        Ok(self.list(usize::MAX)?.into_iter().find(|r| r.id == id))
    }

    /// Remove a record. Returns whether it existed.
    fn delete(&self, id: &str) -> Result<bool, PersistenceError>;
}

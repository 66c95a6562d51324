//! JSON-lines history file.

use super::{HistoryRecord, HistoryStore};
use crate::error::PersistenceError;
use serde::Deserialize;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// History store backed by one JSON object per line.
#[derive(Debug, Clone)]
pub struct JsonlHistoryStore {
    path: PathBuf,
}

/// Just enough of a line to match it by id.
#[derive(Deserialize)]
struct RecordId {
    id: String,
}

impl JsonlHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw lines of the log; a missing file is an empty log.
    fn read_lines(&self) -> Result<Vec<String>, PersistenceError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(str::to_string)
                .collect()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl HistoryStore for JsonlHistoryStore {
    fn insert(&self, record: HistoryRecord) -> Result<HistoryRecord, PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let line = serde_json::to_string(&record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;

        debug!("Saved analysis {} to {}", record.id, self.path.display());
        Ok(record)
    }

    fn list(&self, limit: usize) -> Result<Vec<HistoryRecord>, PersistenceError> {
        let mut records: Vec<HistoryRecord> = self
            .read_lines()?
            .iter()
            .enumerate()
            .filter_map(|(i, line)| match serde_json::from_str(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping malformed history line {}: {}", i + 1, e);
                    None
                }
            })
            .collect();

        // Later lines win ties on created_at.
        records.reverse();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }

    fn delete(&self, id: &str) -> Result<bool, PersistenceError> {
        let lines = self.read_lines()?;
        let before = lines.len();

        let kept: Vec<String> = lines
            .into_iter()
            .filter(|line| {
                serde_json::from_str::<RecordId>(line)
                    .map(|r| r.id != id)
                    .unwrap_or(true)
            })
            .collect();

        if kept.len() == before {
            return Ok(false);
        }

        let tmp = self.path.with_extension("jsonl.tmp");
        let mut content = kept.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;

        debug!("Deleted analysis {} from {}", id, self.path.display());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CombinedResult, DirtyFinding, FileInfo, FileType, PrimaryFinding, ReviewFinding};
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn record(name: &str, minutes_ago: i64, with_review: bool) -> HistoryRecord {
        let primary = PrimaryFinding {
            the_good: vec!["good".to_string()],
            the_bad: vec!["bad".to_string()],
            the_dirty: vec![DirtyFinding {
                text: "dirty".to_string(),
                why: None,
            }],
            summary: format!("Summary of {}", name),
        };
        let review = with_review.then(|| ReviewFinding {
            co_signs: vec!["agree".to_string()],
            watch_outs: vec![],
            bottom_line: "Fine.".to_string(),
        });

        let mut record = HistoryRecord::new(
            FileInfo {
                file_name: name.to_string(),
                file_type: FileType::Csv,
                file_size: 1024,
                row_count: 10,
                col_count: 2,
                truncated: false,
            },
            CombinedResult::new(primary, review),
        );
        record.created_at = Utc::now() - Duration::minutes(minutes_ago);
        record
    }

    fn store(temp_dir: &TempDir) -> JsonlHistoryStore {
        JsonlHistoryStore::new(temp_dir.path().join("nested").join("history.jsonl"))
    }

    #[test]
    fn test_list_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        assert!(store(&temp_dir).list(50).unwrap().is_empty());
    }

    #[test]
    fn test_insert_and_list_newest_first() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        store.insert(record("old.csv", 30, false)).unwrap();
        store.insert(record("new.csv", 1, true)).unwrap();
        store.insert(record("mid.csv", 10, false)).unwrap();

        let listed = store.list(50).unwrap();
        let names: Vec<_> = listed.iter().map(|r| r.file.file_name.as_str()).collect();
        assert_eq!(names, vec!["new.csv", "mid.csv", "old.csv"]);
        assert_eq!(listed[0].result.version(), 2);
        assert_eq!(listed[1].result.version(), 1);

        assert_eq!(store.list(2).unwrap().len(), 2);
    }

    #[test]
    fn test_round_trip_preserves_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        let saved = store.insert(record("ledger.csv", 0, true)).unwrap();
        let loaded = store.get(&saved.id).unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        let keep = store.insert(record("keep.csv", 5, false)).unwrap();
        let gone = store.insert(record("gone.csv", 1, false)).unwrap();

        assert!(store.delete(&gone.id).unwrap());
        assert!(!store.delete(&gone.id).unwrap());

        let listed = store.list(50).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, keep.id);
    }

    #[test]
    fn test_malformed_lines_are_skipped_and_kept() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        let saved = store.insert(record("ok.csv", 0, false)).unwrap();
        let mut file = OpenOptions::new().append(true).open(store.path()).unwrap();
        writeln!(file, "{{not json").unwrap();

        assert_eq!(store.list(50).unwrap().len(), 1);

        assert!(store.delete(&saved.id).unwrap());
        let content = fs::read_to_string(store.path()).unwrap();
        assert_eq!(content, "{not json\n");
    }
}

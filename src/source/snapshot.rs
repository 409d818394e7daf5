//! Offline snapshots of tracker responses.
//!
//! A snapshot is a single JSON document:
//!
//! ```json
//! {
//!   "fields":    [{"id": "customfield_10020", "name": "Sprint"}],
//!   "issues":    [{"key": "LMS-1", "fields": {...}}],
//!   "histories": {"LMS-1": [{"id": "1", "created": "...", "items": [...]}]},
//!   "queries":   {"project = LMS": ["LMS-1"]}
//! }
//! ```
//!
//! [`SnapshotExecutor`] replays one; [`RecordingExecutor`] captures one from
//! any other executor.

use super::QueryExecutor;
use super::jira::field_map_from_defs;
use crate::error::{Result, SnapshotError};
use crate::model::{FieldDef, RawHistory, RawIssue};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Recorded tracker responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub issues: Vec<RawIssue>,
    #[serde(default)]
    pub histories: BTreeMap<String, Vec<RawHistory>>,
    /// Issue keys returned by each recorded JQL query, in result order.
    #[serde(default)]
    pub queries: BTreeMap<String, Vec<String>>,
}

impl Snapshot {
    /// Read a snapshot from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is not a valid snapshot.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            SnapshotError::Config(format!("Cannot open snapshot {}: {e}", path.display()))
        })?;
        let snapshot: Self = serde_json::from_reader(BufReader::new(file))?;
        info!(
            path = %path.display(),
            issues = snapshot.issues.len(),
            histories = snapshot.histories.len(),
            queries = snapshot.queries.len(),
            "Loaded snapshot"
        );
        Ok(snapshot)
    }

    /// Write the snapshot as pretty JSON, replacing any previous file atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if any file operation fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("json.tmp");
        let mut writer = BufWriter::new(File::create(&temp_path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        writer
            .into_inner()
            .map_err(|e| SnapshotError::Io(e.into_error()))?
            .sync_all()?;

        fs::rename(&temp_path, path)?;
        info!(path = %path.display(), issues = self.issues.len(), "Saved snapshot");
        Ok(())
    }

    fn issue(&self, key: &str) -> Option<&RawIssue> {
        self.issues.iter().find(|issue| issue.key == key)
    }

    /// Insert or replace an issue by key, keeping first-seen order.
    fn upsert_issue(&mut self, issue: RawIssue) {
        match self.issues.iter_mut().find(|existing| existing.key == issue.key) {
            Some(existing) => *existing = issue,
            None => self.issues.push(issue),
        }
    }
}

/// Replays a [`Snapshot`] as if it were a live tracker.
///
/// A recorded query returns its recorded keys. Any other query returns every
/// issue in the snapshot. Both are capped at `max_results`.
#[derive(Debug, Clone)]
pub struct SnapshotExecutor {
    snapshot: Snapshot,
}

impl SnapshotExecutor {
    #[must_use]
    pub const fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    /// Load a snapshot file and wrap it.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read.
    pub fn from_path(path: &Path) -> Result<Self> {
        Snapshot::load(path).map(Self::new)
    }

    #[must_use]
    pub const fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

impl QueryExecutor for SnapshotExecutor {
    fn search(&self, jql: &str, max_results: usize) -> Result<Vec<RawIssue>> {
        let issues: Vec<RawIssue> = match self.snapshot.queries.get(jql) {
            Some(keys) => keys
                .iter()
                .filter_map(|key| self.snapshot.issue(key))
                .take(max_results)
                .cloned()
                .collect(),
            None => {
                debug!(jql, "Query not recorded, replaying all issues");
                self.snapshot.issues.iter().take(max_results).cloned().collect()
            }
        };
        Ok(issues)
    }

    fn fetch_history(&self, issue_key: &str) -> Result<Vec<RawHistory>> {
        Ok(self
            .snapshot
            .histories
            .get(issue_key)
            .cloned()
            .unwrap_or_default())
    }

    fn field_name_map(&self) -> Result<HashMap<String, String>> {
        Ok(field_map_from_defs(self.snapshot.fields.clone()))
    }
}

/// Wraps another executor and records every successful response.
///
/// Errors from the inner executor pass through and are not recorded.
#[derive(Debug)]
pub struct RecordingExecutor<E> {
    inner: E,
    recorded: RefCell<Snapshot>,
}

impl<E: QueryExecutor> RecordingExecutor<E> {
    #[must_use]
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            recorded: RefCell::new(Snapshot::default()),
        }
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.recorded.borrow().clone()
    }

    #[must_use]
    pub fn into_snapshot(self) -> Snapshot {
        self.recorded.into_inner()
    }
}

impl<E: QueryExecutor> QueryExecutor for RecordingExecutor<E> {
    fn search(&self, jql: &str, max_results: usize) -> Result<Vec<RawIssue>> {
        let issues = self.inner.search(jql, max_results)?;

        let mut recorded = self.recorded.borrow_mut();
        recorded.queries.insert(
            jql.to_string(),
            issues.iter().map(|issue| issue.key.clone()).collect(),
        );
        for issue in &issues {
            recorded.upsert_issue(issue.clone());
        }
        drop(recorded);

        Ok(issues)
    }

    fn fetch_history(&self, issue_key: &str) -> Result<Vec<RawHistory>> {
        let histories = self.inner.fetch_history(issue_key)?;
        self.recorded
            .borrow_mut()
            .histories
            .insert(issue_key.to_string(), histories.clone());
        Ok(histories)
    }

    fn field_name_map(&self) -> Result<HashMap<String, String>> {
        let map = self.inner.field_name_map()?;

        let mut fields: Vec<FieldDef> = map
            .iter()
            .map(|(name, id)| FieldDef {
                id: id.clone(),
                name: name.clone(),
            })
            .collect();
        fields.sort_by(|a, b| a.name.cmp(&b.name));
        self.recorded.borrow_mut().fields = fields;

        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample() -> Snapshot {
        Snapshot {
            fields: vec![FieldDef {
                id: "customfield_10020".to_string(),
                name: "Sprint".to_string(),
            }],
            issues: vec![
                RawIssue::new("LMS-1", json!({"summary": "one"})),
                RawIssue::new("LMS-2", json!({"summary": "two"})),
                RawIssue::new("LMS-3", json!({"summary": "three"})),
            ],
            histories: BTreeMap::from([(
                "LMS-1".to_string(),
                vec![RawHistory {
                    id: "10".to_string(),
                    author: None,
                    created: "2023-02-01T10:00:00.000+0000".to_string(),
                    items: Vec::new(),
                }],
            )]),
            queries: BTreeMap::from([(
                "team = Alpha".to_string(),
                vec!["LMS-3".to_string(), "LMS-1".to_string()],
            )]),
        }
    }

    #[test]
    fn test_recorded_query_returns_recorded_keys_in_order() {
        let executor = SnapshotExecutor::new(sample());
        let issues = executor.search("team = Alpha", 10).unwrap();
        let keys: Vec<&str> = issues.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["LMS-3", "LMS-1"]);
    }

    #[test]
    fn test_unknown_query_returns_all_capped() {
        let executor = SnapshotExecutor::new(sample());
        assert_eq!(executor.search("anything", 10).unwrap().len(), 3);
        assert_eq!(executor.search("anything", 2).unwrap().len(), 2);
        assert!(executor.search("anything", 0).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_issue_has_empty_history() {
        let executor = SnapshotExecutor::new(sample());
        assert_eq!(executor.fetch_history("LMS-1").unwrap().len(), 1);
        assert!(executor.fetch_history("LMS-404").unwrap().is_empty());
    }

    #[test]
    fn test_field_name_map_from_fields() {
        let executor = SnapshotExecutor::new(sample());
        let map = executor.field_name_map().unwrap();
        assert_eq!(map.get("Sprint").map(String::as_str), Some("customfield_10020"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("snapshot.json");
        sample().save(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(Snapshot::load(&path).unwrap(), sample());
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = Snapshot::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SnapshotError::Config(_)));
    }

    #[test]
    fn test_recording_captures_replayable_snapshot() {
        let recorder = RecordingExecutor::new(SnapshotExecutor::new(sample()));
        recorder.field_name_map().unwrap();
        let issues = recorder.search("team = Alpha", 10).unwrap();
        for issue in &issues {
            recorder.fetch_history(&issue.key).unwrap();
        }

        let recorded = recorder.into_snapshot();
        assert_eq!(recorded.issues.len(), 2);
        assert_eq!(recorded.histories.len(), 2);
        assert!(recorded.histories["LMS-3"].is_empty());

        let replay = SnapshotExecutor::new(recorded);
        let again = replay.search("team = Alpha", 10).unwrap();
        assert_eq!(again, issues);
    }
}

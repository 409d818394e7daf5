//! Query executors: where issue records come from.
//!
//! The pipeline only sees the [`QueryExecutor`] trait. Implementations:
//! - [`JiraClient`] talks to a live Jira over REST
//! - [`SnapshotExecutor`] replays a recorded JSON snapshot offline
//! - [`RecordingExecutor`] wraps another executor and captures its responses

mod jira;
mod snapshot;

pub use jira::{Deployment, JiraClient, JiraCredentials};
pub use snapshot::{RecordingExecutor, Snapshot, SnapshotExecutor};

use crate::error::Result;
use crate::model::{RawHistory, RawIssue};
use std::collections::HashMap;

/// Black-box access to the tracker.
///
/// Errors (transport, auth, API) are returned unmodified; callers do not retry.
pub trait QueryExecutor {
    /// Run a JQL query, returning at most `max_results` issues.
    ///
    /// # Errors
    ///
    /// Returns an error if the tracker cannot be reached or rejects the query.
    fn search(&self, jql: &str, max_results: usize) -> Result<Vec<RawIssue>>;

    /// Fetch the full change history of one issue.
    ///
    /// # Errors
    ///
    /// Returns an error if the tracker cannot be reached or rejects the request.
    fn fetch_history(&self, issue_key: &str) -> Result<Vec<RawHistory>>;

    /// Map of human field name to the tracker's field id.
    ///
    /// # Errors
    ///
    /// Returns an error if the tracker cannot be reached or rejects the request.
    fn field_name_map(&self) -> Result<HashMap<String, String>>;
}

impl<E: QueryExecutor + ?Sized> QueryExecutor for &E {
    fn search(&self, jql: &str, max_results: usize) -> Result<Vec<RawIssue>> {
        (**self).search(jql, max_results)
    }

    fn fetch_history(&self, issue_key: &str) -> Result<Vec<RawHistory>> {
        (**self).fetch_history(issue_key)
    }

    fn field_name_map(&self) -> Result<HashMap<String, String>> {
        (**self).field_name_map()
    }
}

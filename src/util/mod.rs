//! Shared utilities for `jira_snapshot`.
//!
//! - Time parsing (tracker timestamps, calendar dates, JQL date floors)
//! - Progress indicators (for long-running fetches)

pub mod progress;
pub mod time;

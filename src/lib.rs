//! `jira_snapshot`: extract Jira issues and changelogs into flat tables and
//! tag them with sprint, value, done and regression-bug signals.
//!
//! The pipeline runs `fetch → flatten → enrich → persist` against any
//! [`source::QueryExecutor`]: a live [`source::JiraClient`] or an offline
//! [`source::SnapshotExecutor`].

pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod format;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod source;
pub mod table;
pub mod tagging;
pub mod util;

pub use error::{ErrorCode, Result, SnapshotError, StructuredError};

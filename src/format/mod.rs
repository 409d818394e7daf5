//! Output formatting for `jira_snapshot`.
//!
//! The [`csv`] module writes tables as RFC 4180 CSV with a header row.

pub mod csv;

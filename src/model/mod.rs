//! Core data types for `jira_snapshot`.
//!
//! This module defines the types that flow through the pipeline:
//! - `RawIssue` / `RawHistory` - Tracker records as returned by a query executor
//! - `IssueRow` - One flattened issue
//! - `HistoryRow` - One flattened (history entry x changed field)
//! - `RcaAttribute` - The ordered release/RCA attributes

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Column names of the flattened issue table, in contract order.
pub mod columns {
    pub const CREATED: &str = "created datetime";
    pub const KEY: &str = "key";
    pub const ISSUE_TYPE: &str = "issue type";
    pub const SUMMARY: &str = "summary";
    pub const REPORTER: &str = "reporter";
    pub const STATUS: &str = "status";
    pub const SPRINT: &str = "sprint";
    pub const STORY_POINTS: &str = "story points";
    pub const EPIC_LINK: &str = "Epic Link";
    pub const TEAM: &str = "team";
    pub const TIME_SPENT: &str = "time spent (s)";
}

/// Human field names resolved through the tracker's field-name map.
pub mod field_names {
    pub const SPRINT: &str = "Sprint";
    pub const STORY_POINTS: &str = "Story Points";
    pub const EPIC_LINK: &str = "Epic Link";
    pub const TEAM: &str = "Team";
    pub const TIME_SPENT: &str = "Σ Time Spent";
}

/// Issue table header.
pub const ISSUE_COLUMNS: [&str; 17] = [
    columns::CREATED,
    columns::KEY,
    columns::ISSUE_TYPE,
    columns::SUMMARY,
    columns::REPORTER,
    columns::STATUS,
    columns::SPRINT,
    columns::STORY_POINTS,
    columns::EPIC_LINK,
    columns::TEAM,
    columns::TIME_SPENT,
    RcaAttribute::ReleaseActual.name(),
    RcaAttribute::ReleaseEstimatedOriginal.name(),
    RcaAttribute::ReleaseEstimatedCurrent.name(),
    RcaAttribute::IssueClassification.name(),
    RcaAttribute::CausingTicket.name(),
    RcaAttribute::FixVersions.name(),
];

/// Changelog table header.
pub const HISTORY_COLUMNS: [&str; 10] = [
    "field",
    "fieldtype",
    "from",
    "fromString",
    "to",
    "toString",
    "author",
    "created",
    "id",
    "key",
];

/// One tracker issue: its key plus the raw field map keyed by field id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawIssue {
    pub key: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl RawIssue {
    /// Build an issue from a key and a JSON object of fields.
    ///
    /// Non-object values yield an empty field map.
    #[must_use]
    pub fn new(key: impl Into<String>, fields: Value) -> Self {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            key: key.into(),
            fields,
        }
    }
}

/// A tracker user reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserRef {
    #[serde(rename = "displayName", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "accountId", default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

impl UserRef {
    /// Best label for the user: display name, then login name, then account id.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .or(self.name.as_deref())
            .or(self.account_id.as_deref())
    }
}

/// One edit event inside an issue's changelog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawHistory {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<UserRef>,
    pub created: String,
    #[serde(default)]
    pub items: Vec<RawChangeItem>,
}

/// One field-level change inside a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawChangeItem {
    pub field: String,
    #[serde(default)]
    pub fieldtype: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(rename = "fromString", default)]
    pub from_string: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(rename = "toString", default)]
    pub to_string: Option<String>,
}

/// A tracker field definition (`GET /rest/api/2/field`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub id: String,
    pub name: String,
}

/// Release and root-cause-analysis attributes, in the order the value flag scans them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RcaAttribute {
    ReleaseActual,
    ReleaseEstimatedOriginal,
    ReleaseEstimatedCurrent,
    IssueClassification,
    CausingTicket,
    FixVersions,
}

impl RcaAttribute {
    pub const ALL: [Self; 6] = [
        Self::ReleaseActual,
        Self::ReleaseEstimatedOriginal,
        Self::ReleaseEstimatedCurrent,
        Self::IssueClassification,
        Self::CausingTicket,
        Self::FixVersions,
    ];

    /// Tracker field name, also used verbatim as the column name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ReleaseActual => "Release Date (Actual)",
            Self::ReleaseEstimatedOriginal => "Release Date (Estimated - Original)",
            Self::ReleaseEstimatedCurrent => "Release Date (Estimated - Current)",
            Self::IssueClassification => "RCA - Issue Classification",
            Self::CausingTicket => "RCA - Causing Ticket",
            Self::FixVersions => "Fix versions",
        }
    }
}

impl fmt::Display for RcaAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The six release/RCA cells of an issue row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RcaFields {
    values: [Option<String>; 6],
}

impl RcaFields {
    #[must_use]
    pub fn get(&self, attr: RcaAttribute) -> Option<&str> {
        self.values[Self::index(attr)].as_deref()
    }

    pub fn set(&mut self, attr: RcaAttribute, value: Option<String>) {
        self.values[Self::index(attr)] = value;
    }

    #[must_use]
    pub fn with(mut self, attr: RcaAttribute, value: impl Into<String>) -> Self {
        self.set(attr, Some(value.into()));
        self
    }

    const fn index(attr: RcaAttribute) -> usize {
        match attr {
            RcaAttribute::ReleaseActual => 0,
            RcaAttribute::ReleaseEstimatedOriginal => 1,
            RcaAttribute::ReleaseEstimatedCurrent => 2,
            RcaAttribute::IssueClassification => 3,
            RcaAttribute::CausingTicket => 4,
            RcaAttribute::FixVersions => 5,
        }
    }
}

/// One flattened issue.
///
/// `None` is the missing marker for every optional cell.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueRow {
    /// Creation timestamp exactly as the tracker reported it.
    pub created: String,
    pub key: String,
    pub issue_type: String,
    pub summary: String,
    pub reporter: String,
    pub status: String,
    /// Sprint display names; `None` when the issue was never in a sprint.
    pub sprints: Option<Vec<String>>,
    pub story_points: Option<f64>,
    pub epic_link: Option<String>,
    pub team: Option<String>,
    /// Cumulative time spent, in seconds.
    pub time_spent: Option<i64>,
    pub rca: RcaFields,
}

/// One flattened changelog row: a single field change with its entry's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HistoryRow {
    pub field: String,
    pub fieldtype: Option<String>,
    pub from: Option<String>,
    pub from_string: Option<String>,
    pub to: Option<String>,
    pub to_string: Option<String>,
    pub author: Option<String>,
    pub created: String,
    pub id: String,
    pub key: String,
}

//! Derived-field tagging.
//!
//! Four independent, pure heuristics over one issue row:
//!
//! | column | rule |
//! |---|---|
//! | `sprint-cleaned` | [`get_sprint`] on the row's single sprint label |
//! | `ticket-with-value` | [`ticket_with_value`] |
//! | `ticket-done` | [`ticket_done`] |
//! | `ticket-a-bug` | [`ticket_a_bug`] |
//!
//! The three flags are only ever `Some(true)` or `None`. `None` means "not
//! confirmed", never "confirmed false".

use crate::model::{ISSUE_COLUMNS, IssueRow, RcaAttribute};
use crate::table::{Cell, Record};
use regex::Regex;
use std::sync::LazyLock;

/// Derived column names, appended after the issue columns.
pub const TAG_COLUMNS: [&str; 4] = [
    "sprint-cleaned",
    "ticket-with-value",
    "ticket-done",
    "ticket-a-bug",
];

/// Statuses that count as done. Case-sensitive.
pub const DONE_STATUSES: &[&str] = &[
    "Closed",
    "Launched",
    "Pending Release",
    "Release Preparation",
    "Post-Release Monitoring",
    "Data Gathering",
];

/// Issue types that always carry business value.
pub const VALUE_ISSUE_TYPES: &[&str] = &["Story", "Bug"];

/// Classification marking a bug that escaped a release.
pub const POST_RELEASE_BUG: &str = "post-release-bug";

static SPRINT_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sprint ?\d+\.\d+").expect("valid regex"));
static SPRINT_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sprint ?\d+").expect("valid regex"));

/// Normalize a sprint display name to `sprint <number>`.
///
/// `"Board Sprint 14.2 (Jan 1 - Jan 14)"` becomes `"sprint 14.2"`.
/// Labels without a sprint number yield `None`.
#[must_use]
pub fn get_sprint(label: &str) -> Option<String> {
    let lowered = label.to_lowercase();
    let pattern = if lowered.contains('.') {
        &SPRINT_DECIMAL
    } else {
        &SPRINT_INTEGER
    };

    let token = pattern.find(&lowered)?.as_str();
    let number = token.replace("sprint ", "").replace("sprint", "");
    Some(format!("sprint {number}"))
}

/// Whether the ticket carries business value.
///
/// Stories and bugs always do. For any other type only the first RCA/release
/// attribute in [`RcaAttribute::ALL`] is consulted: present means value,
/// absent means missing. The other five attributes never affect the result.
#[must_use]
pub fn ticket_with_value(row: &IssueRow) -> Option<bool> {
    if VALUE_ISSUE_TYPES.contains(&row.issue_type.as_str()) {
        return Some(true);
    }

    let first = RcaAttribute::ALL[0];
    row.rca.get(first).map(|_| true)
}

/// Whether the ticket reached a terminal status.
#[must_use]
pub fn ticket_done(row: &IssueRow) -> Option<bool> {
    DONE_STATUSES.contains(&row.status.as_str()).then_some(true)
}

/// Whether the ticket is a regression bug: it names a causing ticket and is
/// classified as [`POST_RELEASE_BUG`].
#[must_use]
pub fn ticket_a_bug(row: &IssueRow) -> Option<bool> {
    row.rca.get(RcaAttribute::CausingTicket)?;
    let classification = row.rca.get(RcaAttribute::IssueClassification)?;
    (classification == POST_RELEASE_BUG).then_some(true)
}

/// The four derived cells of one row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tags {
    pub sprint_cleaned: Option<String>,
    pub with_value: Option<bool>,
    pub done: Option<bool>,
    pub a_bug: Option<bool>,
}

impl Tags {
    /// Compute all tags for a row whose sprint cell holds `sprint`.
    #[must_use]
    pub fn compute(row: &IssueRow, sprint: &str) -> Self {
        Self {
            sprint_cleaned: get_sprint(sprint),
            with_value: ticket_with_value(row),
            done: ticket_done(row),
            a_bug: ticket_a_bug(row),
        }
    }
}

/// One issue in one sprint, with its derived tags.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedRow {
    pub issue: IssueRow,
    pub sprint: String,
    pub tags: Tags,
}

/// Expand rows to one per (issue, sprint) and tag each.
///
/// Issues without any sprint are dropped here. Output order is input order,
/// then sprint order within an issue.
#[must_use]
pub fn expand_and_tag(rows: &[IssueRow]) -> Vec<TaggedRow> {
    rows.iter()
        .flat_map(|issue| {
            issue
                .sprints
                .iter()
                .flatten()
                .map(move |sprint| TaggedRow {
                    issue: issue.clone(),
                    sprint: sprint.clone(),
                    tags: Tags::compute(issue, sprint),
                })
        })
        .collect()
}

impl Record for TaggedRow {
    fn columns() -> Vec<&'static str> {
        ISSUE_COLUMNS.iter().chain(TAG_COLUMNS.iter()).copied().collect()
    }

    fn cells(&self) -> Vec<Cell> {
        let mut cells = self
            .issue
            .cells_with_sprint(Cell::from(self.sprint.as_str()));
        cells.push(Cell::from(self.tags.sprint_cleaned.clone()));
        cells.push(Cell::from(self.tags.with_value));
        cells.push(Cell::from(self.tags.done));
        cells.push(Cell::from(self.tags.a_bug));
        cells
    }
}

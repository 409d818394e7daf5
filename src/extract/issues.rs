//! Issue flattening: one row per tracker issue.

use super::{FieldResolver, display_value};
use crate::error::{Result, SnapshotError};
use crate::model::{ISSUE_COLUMNS, IssueRow, RawIssue, RcaAttribute, RcaFields, field_names};
use crate::table::{Cell, Record};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Legacy Jira Server sprint encoding, e.g.
/// `...sprint.Sprint@1a2b[id=12,rapidViewId=3,state=CLOSED,name=Board Sprint 1,...]`
static LEGACY_SPRINT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bname=([^,\]]+)").expect("valid regex"));

/// Flatten issue records into rows, preserving input order.
///
/// # Errors
///
/// Returns `MissingField` if an issue lacks creation time, issue type,
/// summary, reporter or status.
pub fn flatten_issues(
    issues: &[RawIssue],
    field_map: &HashMap<String, String>,
) -> Result<Vec<IssueRow>> {
    let resolver = FieldResolver::new(field_map);
    issues
        .iter()
        .map(|issue| flatten_issue(issue, &resolver))
        .collect()
}

/// Flatten a single issue record.
///
/// # Errors
///
/// Returns `MissingField` if a required field is absent.
pub fn flatten_issue(issue: &RawIssue, resolver: &FieldResolver<'_>) -> Result<IssueRow> {
    if issue.key.trim().is_empty() {
        return Err(SnapshotError::missing_field("<unknown>", "key"));
    }

    let row = IssueRow {
        created: required_str(issue, &["created"])?,
        key: issue.key.clone(),
        issue_type: required_str(issue, &["issuetype", "name"])?,
        summary: required_str(issue, &["summary"])?,
        reporter: required_str(issue, &["reporter", "displayName"])?,
        status: required_str(issue, &["status", "name"])?,
        sprints: resolver
            .lookup(issue, field_names::SPRINT)
            .and_then(sprint_names),
        story_points: resolver
            .lookup(issue, field_names::STORY_POINTS)
            .and_then(|v| as_number(issue, field_names::STORY_POINTS, v)),
        epic_link: resolver.display(issue, field_names::EPIC_LINK),
        team: resolver.display(issue, field_names::TEAM),
        time_spent: resolver
            .lookup(issue, field_names::TIME_SPENT)
            .and_then(|v| as_seconds(issue, v)),
        rca: rca_fields(issue, resolver),
    };

    debug!(key = %row.key, summary = %row.summary, reporter = %row.reporter, "Flattened issue");
    Ok(row)
}

fn rca_fields(issue: &RawIssue, resolver: &FieldResolver<'_>) -> RcaFields {
    let mut rca = RcaFields::default();
    for attr in RcaAttribute::ALL {
        rca.set(attr, resolver.display(issue, attr.name()));
    }
    rca
}

/// Read a required string at a JSON path inside the issue's fields.
fn required_str(issue: &RawIssue, path: &[&str]) -> Result<String> {
    let mut current = path
        .first()
        .and_then(|head| issue.fields.get(*head));
    for segment in path.iter().skip(1) {
        current = current.and_then(|value| value.get(*segment));
    }

    current
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| SnapshotError::missing_field(&issue.key, path.join(".")))
}

/// Sprint display names from the multi-valued sprint field.
///
/// An empty list is the missing marker, same as an absent field.
fn sprint_names(value: &Value) -> Option<Vec<String>> {
    let names: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(sprint_name).collect(),
        other => sprint_name(other).into_iter().collect(),
    };
    if names.is_empty() { None } else { Some(names) }
}

fn sprint_name(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => map
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string),
        Value::String(raw) => LEGACY_SPRINT_NAME
            .captures(raw)
            .and_then(|caps| caps.get(1))
            .map_or_else(|| Some(raw.clone()), |m| Some(m.as_str().to_string()))
            .filter(|name| !name.is_empty()),
        _ => None,
    }
}

fn as_number(issue: &RawIssue, field: &str, value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    if parsed.is_none() {
        warn!(key = %issue.key, field, value = %value, "Expected a number, treating as missing");
    }
    parsed
}

fn as_seconds(issue: &RawIssue, value: &Value) -> Option<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    if parsed.is_none() {
        warn!(
            key = %issue.key,
            field = field_names::TIME_SPENT,
            value = %value,
            "Expected whole seconds, treating as missing"
        );
    }
    parsed
}

impl IssueRow {
    /// Cells in issue-table order, with `sprint` supplied by the caller.
    ///
    /// The raw table passes the full sprint list; the expanded table passes
    /// the single sprint of that row.
    #[must_use]
    pub fn cells_with_sprint(&self, sprint: Cell) -> Vec<Cell> {
        let mut cells = vec![
            Cell::from(self.created.as_str()),
            Cell::from(self.key.as_str()),
            Cell::from(self.issue_type.as_str()),
            Cell::from(self.summary.as_str()),
            Cell::from(self.reporter.as_str()),
            Cell::from(self.status.as_str()),
            sprint,
            Cell::from(self.story_points),
            Cell::from(self.epic_link.clone()),
            Cell::from(self.team.clone()),
            Cell::from(self.time_spent),
        ];
        cells.extend(
            RcaAttribute::ALL
                .iter()
                .map(|attr| Cell::from(self.rca.get(*attr))),
        );
        cells
    }
}

impl Record for IssueRow {
    fn columns() -> Vec<&'static str> {
        ISSUE_COLUMNS.to_vec()
    }

    fn cells(&self) -> Vec<Cell> {
        self.cells_with_sprint(Cell::from(self.sprints.clone()))
    }
}

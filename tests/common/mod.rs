#![allow(dead_code)]

use jira_snapshot::Result;
use jira_snapshot::model::{RawChangeItem, RawHistory, RawIssue, UserRef};
use jira_snapshot::source::QueryExecutor;
use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Once;

pub mod cli;
pub mod tracker_http;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        jira_snapshot::logging::init_test_logging();
    });
}

/// Field ids the fake tracker uses for the human field names.
pub const SPRINT_ID: &str = "customfield_10020";
pub const STORY_POINTS_ID: &str = "customfield_10016";
pub const EPIC_LINK_ID: &str = "customfield_10014";
pub const TEAM_ID: &str = "customfield_10001";
pub const TIME_SPENT_ID: &str = "aggregatetimespent";
pub const RELEASE_ACTUAL_ID: &str = "customfield_20001";
pub const RELEASE_ORIGINAL_ID: &str = "customfield_20002";
pub const RELEASE_CURRENT_ID: &str = "customfield_20003";
pub const CLASSIFICATION_ID: &str = "customfield_20004";
pub const CAUSING_TICKET_ID: &str = "customfield_20005";
pub const FIX_VERSIONS_ID: &str = "fixVersions";

pub fn field_map() -> HashMap<String, String> {
    [
        ("Sprint", SPRINT_ID),
        ("Story Points", STORY_POINTS_ID),
        ("Epic Link", EPIC_LINK_ID),
        ("Team", TEAM_ID),
        ("Σ Time Spent", TIME_SPENT_ID),
        ("Release Date (Actual)", RELEASE_ACTUAL_ID),
        ("Release Date (Estimated - Original)", RELEASE_ORIGINAL_ID),
        ("Release Date (Estimated - Current)", RELEASE_CURRENT_ID),
        ("RCA - Issue Classification", CLASSIFICATION_ID),
        ("RCA - Causing Ticket", CAUSING_TICKET_ID),
        ("Fix versions", FIX_VERSIONS_ID),
    ]
    .into_iter()
    .map(|(name, id)| (name.to_string(), id.to_string()))
    .collect()
}

/// Builder for tracker-shaped issue JSON.
pub struct IssueBuilder {
    key: String,
    fields: Value,
}

impl IssueBuilder {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            fields: json!({
                "created": "2023-02-01T10:00:00.000+0000",
                "issuetype": {"name": "Task"},
                "summary": format!("Summary of {key}"),
                "reporter": {"displayName": "Grace Hopper"},
                "status": {"name": "In Progress"}
            }),
        }
    }

    pub fn issue_type(mut self, name: &str) -> Self {
        self.fields["issuetype"] = json!({"name": name});
        self
    }

    pub fn status(mut self, name: &str) -> Self {
        self.fields["status"] = json!({"name": name});
        self
    }

    pub fn created(mut self, timestamp: &str) -> Self {
        self.fields["created"] = json!(timestamp);
        self
    }

    pub fn sprints(mut self, names: &[&str]) -> Self {
        let sprints: Vec<Value> = names
            .iter()
            .enumerate()
            .map(|(i, name)| json!({"id": i + 1, "name": name, "state": "closed"}))
            .collect();
        self.fields[SPRINT_ID] = Value::Array(sprints);
        self
    }

    pub fn team(mut self, team: &str) -> Self {
        self.fields[TEAM_ID] = json!({"value": team});
        self
    }

    pub fn field(mut self, id: &str, value: Value) -> Self {
        self.fields[id] = value;
        self
    }

    pub fn without(mut self, id: &str) -> Self {
        if let Some(map) = self.fields.as_object_mut() {
            map.remove(id);
        }
        self
    }

    pub fn build(self) -> RawIssue {
        RawIssue::new(self.key, self.fields)
    }
}

pub fn change(field: &str, from: &str, to: &str) -> RawChangeItem {
    RawChangeItem {
        field: field.to_string(),
        fieldtype: Some("jira".to_string()),
        from: None,
        from_string: Some(from.to_string()),
        to: None,
        to_string: Some(to.to_string()),
    }
}

pub fn history(id: &str, author: &str, items: Vec<RawChangeItem>) -> RawHistory {
    RawHistory {
        id: id.to_string(),
        author: Some(UserRef {
            display_name: Some(author.to_string()),
            ..UserRef::default()
        }),
        created: "2023-02-02T09:30:00.000+0000".to_string(),
        items,
    }
}

/// In-memory tracker: canned results per JQL, records every call.
#[derive(Default)]
pub struct FakeTracker {
    pub results: HashMap<String, Vec<RawIssue>>,
    pub histories: HashMap<String, Vec<RawHistory>>,
    pub fields: HashMap<String, String>,
    pub searches: RefCell<Vec<(String, usize)>>,
    pub history_calls: RefCell<Vec<String>>,
}

impl FakeTracker {
    pub fn new() -> Self {
        Self {
            fields: field_map(),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, jql: &str, issues: Vec<RawIssue>) -> Self {
        self.results.insert(jql.to_string(), issues);
        self
    }

    pub fn with_history(mut self, key: &str, entries: Vec<RawHistory>) -> Self {
        self.histories.insert(key.to_string(), entries);
        self
    }
}

impl QueryExecutor for FakeTracker {
    fn search(&self, jql: &str, max_results: usize) -> Result<Vec<RawIssue>> {
        self.searches
            .borrow_mut()
            .push((jql.to_string(), max_results));
        Ok(self
            .results
            .get(jql)
            .map(|issues| issues.iter().take(max_results).cloned().collect())
            .unwrap_or_default())
    }

    fn fetch_history(&self, issue_key: &str) -> Result<Vec<RawHistory>> {
        self.history_calls.borrow_mut().push(issue_key.to_string());
        Ok(self.histories.get(issue_key).cloned().unwrap_or_default())
    }

    fn field_name_map(&self) -> Result<HashMap<String, String>> {
        Ok(self.fields.clone())
    }
}

/// Split CSV text into rows of fields (RFC 4180 quoting, no embedded newlines).
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    text.lines().map(parse_csv_line).collect()
}

fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', _) => in_quotes = !in_quotes,
            (',', false) => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Values of one named column, header excluded.
pub fn csv_column(rows: &[Vec<String>], name: &str) -> Vec<String> {
    let idx = rows[0]
        .iter()
        .position(|c| c == name)
        .unwrap_or_else(|| panic!("column {name} not in header {:?}", rows[0]));
    rows[1..].iter().map(|row| row[idx].clone()).collect()
}

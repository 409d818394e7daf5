//! Flattening of tracker records into row tables.
//!
//! - [`issues`] turns issue records into one [`IssueRow`](crate::model::IssueRow) each
//! - [`history`] turns changelogs into one row per changed field
//!
//! Optional fields are resolved through [`FieldResolver`], which maps human
//! field names to the tracker's field ids and treats every kind of absence
//! (unknown name, field not on the issue, JSON `null`) as the missing marker.

pub mod history;
pub mod issues;

pub use history::{concat_histories, flatten_history};
pub use issues::flatten_issues;

use crate::model::RawIssue;
use serde_json::Value;
use std::collections::HashMap;

/// Scoped lookup of optional fields by human name.
#[derive(Debug, Clone, Copy)]
pub struct FieldResolver<'m> {
    name_to_id: &'m HashMap<String, String>,
}

impl<'m> FieldResolver<'m> {
    #[must_use]
    pub const fn new(name_to_id: &'m HashMap<String, String>) -> Self {
        Self { name_to_id }
    }

    /// The tracker's id for a human field name, if the tracker knows the name.
    #[must_use]
    pub fn field_id(&self, name: &str) -> Option<&'m str> {
        self.name_to_id.get(name).map(String::as_str)
    }

    /// The raw value of a named field on one issue, or `None` if absent or null.
    #[must_use]
    pub fn lookup<'i>(&self, issue: &'i RawIssue, name: &str) -> Option<&'i Value> {
        let id = self.field_id(name)?;
        issue.fields.get(id).filter(|value| !value.is_null())
    }

    /// The display text of a named field on one issue.
    #[must_use]
    pub fn display(&self, issue: &RawIssue, name: &str) -> Option<String> {
        self.lookup(issue, name).and_then(display_value)
    }
}

/// Render a tracker JSON value as display text.
///
/// Strings render as-is, numbers and booleans as their text, objects through
/// the first of `value`, `name`, `displayName`, `key`, and arrays by joining
/// their elements with `", "`. Null, empty strings and empty arrays are
/// missing.
#[must_use]
pub fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => ["value", "name", "displayName", "key"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| Some(value.to_string())),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(display_value).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
    }
}

//! Changelog flattening: one row per (history entry x changed field).

use crate::model::{HISTORY_COLUMNS, HistoryRow, RawHistory};
use crate::table::{Cell, Record};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Flatten one issue's change history.
///
/// Every row repeats the entry's author, timestamp and id. An issue without
/// history yields no rows.
#[must_use]
pub fn flatten_history(key: &str, histories: &[RawHistory]) -> Vec<HistoryRow> {
    if histories.is_empty() {
        trace!(key, "No history entries");
        return Vec::new();
    }

    let rows: Vec<HistoryRow> = histories
        .iter()
        .flat_map(|entry| {
            let author = entry
                .author
                .as_ref()
                .and_then(|a| a.label())
                .map(str::to_string);
            entry.items.iter().map(move |item| HistoryRow {
                field: item.field.clone(),
                fieldtype: item.fieldtype.clone(),
                from: item.from.clone(),
                from_string: item.from_string.clone(),
                to: item.to.clone(),
                to_string: item.to_string.clone(),
                author: author.clone(),
                created: entry.created.clone(),
                id: entry.id.clone(),
                key: key.to_string(),
            })
        })
        .collect();

    debug!(key, entries = histories.len(), rows = rows.len(), "Flattened history");
    rows
}

/// Concatenate per-issue changelog batches and drop exact duplicate rows.
///
/// The first occurrence of a row wins, so order follows the batches.
/// Duplicates appear when the same issue is fetched twice in one run.
#[must_use]
pub fn concat_histories<I>(batches: I) -> Vec<HistoryRow>
where
    I: IntoIterator<Item = Vec<HistoryRow>>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut duplicates = 0usize;

    for row in batches.into_iter().flatten() {
        if seen.contains(&row) {
            duplicates += 1;
            continue;
        }
        seen.insert(row.clone());
        out.push(row);
    }

    if duplicates > 0 {
        debug!(duplicates, kept = out.len(), "Dropped duplicate changelog rows");
    }
    out
}

impl Record for HistoryRow {
    fn columns() -> Vec<&'static str> {
        HISTORY_COLUMNS.to_vec()
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            Cell::from(self.field.as_str()),
            Cell::from(self.fieldtype.clone()),
            Cell::from(self.from.clone()),
            Cell::from(self.from_string.clone()),
            Cell::from(self.to.clone()),
            Cell::from(self.to_string.clone()),
            Cell::from(self.author.clone()),
            Cell::from(self.created.as_str()),
            Cell::from(self.id.as_str()),
            Cell::from(self.key.as_str()),
        ]
    }
}

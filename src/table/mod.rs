//! Column-named tabular data.
//!
//! Flatteners and the tagging engine produce typed rows. A [`Table`] is built
//! from those rows once, at persistence time, and is where column-level
//! operations (date normalization, dropping columns) happen.

use crate::error::{Result, SnapshotError};
use crate::util::time::parse_calendar_date;
use chrono::NaiveDate;
use tracing::{debug, warn};

/// A single table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// The uniform missing marker.
    Missing,
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    List(Vec<String>),
    Date(NaiveDate),
}

impl Cell {
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Render the cell as text, using `missing` for the missing marker.
    ///
    /// Lists render as JSON arrays so they survive a CSV round trip.
    #[must_use]
    pub fn render(&self, missing: &str) -> String {
        match self {
            Self::Missing => missing.to_string(),
            Self::Text(value) => value.clone(),
            Self::Integer(value) => value.to_string(),
            Self::Float(value) => render_float(*value),
            Self::Bool(value) => value.to_string(),
            Self::List(values) => serde_json::to_string(values).unwrap_or_default(),
            Self::Date(date) => date.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Whole numbers keep one decimal (`5.0`).
fn render_float(value: f64) -> String {
    if value.is_finite() && value.fract().abs() < f64::EPSILON && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl<T: Into<Self>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Missing, Into::into)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<String>> for Cell {
    fn from(values: Vec<String>) -> Self {
        Self::List(values)
    }
}

/// A typed row that knows its header and how to lay itself out as cells.
pub trait Record {
    /// Column names, in the order [`Record::cells`] yields them.
    fn columns() -> Vec<&'static str>;

    /// The row's cells, one per column.
    fn cells(&self) -> Vec<Cell>;
}

/// Row-major table with a named header.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Create an empty table with the given header.
    #[must_use]
    pub fn with_columns<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Lay out typed records as a table. An empty slice still carries the header.
    #[must_use]
    pub fn from_records<R: Record>(records: &[R]) -> Self {
        Self {
            columns: R::columns().into_iter().map(str::to_string).collect(),
            rows: records.iter().map(Record::cells).collect(),
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All cells of one column, top to bottom.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Append a row.
    ///
    /// # Errors
    ///
    /// Returns an error if the row width differs from the header.
    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(SnapshotError::Config(format!(
                "Row has {} cells but the table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Remove the named columns. Returns the names that were not present.
    pub fn drop_columns<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<String> {
        let mut unknown = Vec::new();
        let mut drop_idx = Vec::new();
        for name in names {
            let name = name.as_ref();
            match self.column_index(name) {
                Some(idx) => drop_idx.push(idx),
                None => unknown.push(name.to_string()),
            }
        }
        drop_idx.sort_unstable();
        drop_idx.dedup();

        for &idx in drop_idx.iter().rev() {
            self.columns.remove(idx);
            for row in &mut self.rows {
                row.remove(idx);
            }
        }

        if !unknown.is_empty() {
            warn!(columns = ?unknown, "Requested columns to drop are not in the table");
        }
        unknown
    }

    /// Reduce the named columns to calendar dates (no time of day).
    ///
    /// Missing cells stay missing; columns absent from the table are skipped.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDate` for a present cell that is not a date or timestamp.
    pub fn normalize_dates<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        for name in names {
            let name = name.as_ref();
            let Some(idx) = self.column_index(name) else {
                debug!(column = name, "Date column not present, skipping");
                continue;
            };

            for row in &mut self.rows {
                let normalized = match &row[idx] {
                    Cell::Missing => Cell::Missing,
                    Cell::Date(date) => Cell::Date(*date),
                    Cell::Text(text) => {
                        let date = parse_calendar_date(text).ok_or_else(|| {
                            SnapshotError::InvalidDate {
                                column: name.to_string(),
                                value: text.clone(),
                            }
                        })?;
                        Cell::Date(date)
                    }
                    other => {
                        return Err(SnapshotError::InvalidDate {
                            column: name.to_string(),
                            value: other.render(""),
                        });
                    }
                };
                row[idx] = normalized;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut table = Table::with_columns(&["key", "created", "notes"]);
        table
            .push_row(vec![
                Cell::from("LMS-1"),
                Cell::from("2023-03-04T09:00:00.000+0000"),
                Cell::Missing,
            ])
            .unwrap();
        table
            .push_row(vec![Cell::from("LMS-2"), Cell::Missing, Cell::from("x")])
            .unwrap();
        table
    }

    #[test]
    fn test_render_cells() {
        assert_eq!(Cell::Missing.render(""), "");
        assert_eq!(Cell::Missing.render("NA"), "NA");
        assert_eq!(Cell::Float(3.5).render(""), "3.5");
        assert_eq!(Cell::Float(5.0).render(""), "5.0");
        assert_eq!(Cell::Float(-2.0).render(""), "-2.0");
        assert_eq!(Cell::Integer(5).render(""), "5");
        assert_eq!(Cell::Bool(true).render(""), "true");
        assert_eq!(
            Cell::List(vec!["Sprint 1".to_string(), "Sprint 2".to_string()]).render(""),
            r#"["Sprint 1","Sprint 2"]"#
        );
    }

    #[test]
    fn test_option_into_cell() {
        assert_eq!(Cell::from(None::<String>), Cell::Missing);
        assert_eq!(Cell::from(Some(7_i64)), Cell::Integer(7));
    }

    #[test]
    fn test_push_row_rejects_wrong_width() {
        let mut table = Table::with_columns(&["a", "b"]);
        assert!(table.push_row(vec![Cell::Missing]).is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn test_normalize_dates() {
        let mut table = sample();
        table.normalize_dates(&["created", "not-there"]).unwrap();
        let created = table.column("created").unwrap();
        assert_eq!(
            created[0],
            &Cell::Date(NaiveDate::from_ymd_opt(2023, 3, 4).unwrap())
        );
        assert_eq!(created[1], &Cell::Missing);
    }

    #[test]
    fn test_normalize_dates_rejects_garbage() {
        let mut table = sample();
        let err = table.normalize_dates(&["notes"]).unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidDate { .. }));
    }

    #[test]
    fn test_drop_columns_reports_unknown() {
        let mut table = sample();
        let unknown = table.drop_columns(&["notes", "Id"]);
        assert_eq!(unknown, vec!["Id".to_string()]);
        assert_eq!(table.columns(), &["key".to_string(), "created".to_string()]);
        assert!(table.rows().iter().all(|row| row.len() == 2));
    }
}

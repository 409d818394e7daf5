//! CSV formatting for `jira_snapshot`.
//!
//! Writes [`Table`]s with a header row. Handles proper escaping of fields
//! containing commas, quotes, or newlines, and renders the missing marker
//! as configurable text (empty by default).

use crate::error::{Result, SnapshotError};
use crate::table::{Cell, Table};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Escape a CSV field value.
///
/// Wraps in double quotes if the value contains commas, quotes, or newlines.
/// Doubles any existing quotes within the value.
#[must_use]
pub fn escape_field(value: &str) -> String {
    let needs_quoting = value.contains(',')
        || value.contains('"')
        || value.contains('\n')
        || value.contains('\r');

    if needs_quoting {
        let escaped = value.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

/// Write CSV header row to the given writer.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_header<W: Write, S: AsRef<str>>(writer: &mut W, fields: &[S]) -> io::Result<()> {
    let header = fields
        .iter()
        .map(|f| escape_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    writeln!(writer, "{header}")
}

/// Format a single row of cells.
#[must_use]
pub fn format_row(cells: &[Cell], missing: &str) -> String {
    cells
        .iter()
        .map(|cell| escape_field(&cell.render(missing)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Write a table as CSV to the given writer.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_table<W: Write>(writer: &mut W, table: &Table, missing: &str) -> io::Result<()> {
    write_header(writer, table.columns())?;
    for row in table.rows() {
        writeln!(writer, "{}", format_row(row, missing))?;
    }
    Ok(())
}

/// Format a table as a complete CSV string.
#[must_use]
pub fn format_table(table: &Table, missing: &str) -> String {
    let mut output = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_table(&mut output, table, missing);
    String::from_utf8_lossy(&output).into_owned()
}

/// Write a table to `path`, replacing any previous file atomically.
///
/// The CSV is written to a sibling temp file, synced, then renamed over the
/// target. Parent directories are created as needed.
///
/// # Errors
///
/// Returns an error if the path has no parent or any file operation fails.
pub fn write_table_file(path: &Path, table: &Table, missing: &str) -> Result<()> {
    let parent_dir = path
        .parent()
        .ok_or_else(|| SnapshotError::Config(format!("Invalid output path: {}", path.display())))?;
    if !parent_dir.as_os_str().is_empty() {
        fs::create_dir_all(parent_dir)?;
    }

    let temp_path = path.with_extension("csv.tmp");
    let temp_file = File::create(&temp_path)?;
    let mut writer = BufWriter::new(temp_file);
    write_table(&mut writer, table, missing)?;

    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| SnapshotError::Io(e.into_error()))?
        .sync_all()?;

    fs::rename(&temp_path, path)?;
    debug!(
        path = %path.display(),
        rows = table.len(),
        columns = table.columns().len(),
        "Wrote CSV artifact"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_table() -> Table {
        let mut table = Table::with_columns(&["key", "summary", "story points"]);
        table
            .push_row(vec![
                Cell::from("LMS-1"),
                Cell::from("Fix bug, then test"),
                Cell::Float(3.0),
            ])
            .unwrap();
        table
            .push_row(vec![Cell::from("LMS-2"), Cell::from("Plain"), Cell::Missing])
            .unwrap();
        table
    }

    #[test]
    fn test_escape_field_plain() {
        assert_eq!(escape_field("simple"), "simple");
        assert_eq!(escape_field("hello world"), "hello world");
    }

    #[test]
    fn test_escape_field_with_comma() {
        assert_eq!(escape_field("hello, world"), "\"hello, world\"");
    }

    #[test]
    fn test_escape_field_with_quotes() {
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_escape_field_with_newline() {
        assert_eq!(escape_field("line1\nline2"), "\"line1\nline2\"");
    }

    #[test]
    fn test_list_cell_is_quoted() {
        let cells = vec![Cell::List(vec!["Sprint 1".to_string(), "Sprint 2".to_string()])];
        assert_eq!(format_row(&cells, ""), r#""[""Sprint 1"",""Sprint 2""]""#);
    }

    #[test]
    fn test_format_table() {
        let csv = format_table(&make_table(), "");
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "key,summary,story points");
        assert_eq!(lines[1], "LMS-1,\"Fix bug, then test\",3.0");
        assert_eq!(lines[2], "LMS-2,Plain,");
    }

    #[test]
    fn test_missing_text_is_configurable() {
        let csv = format_table(&make_table(), "NA");
        assert!(csv.lines().nth(2).unwrap().ends_with(",NA"));
    }

    #[test]
    fn test_write_header() {
        let mut output = Vec::new();
        write_header(&mut output, &["key", "Epic Link", "time spent (s)"]).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "key,Epic Link,time spent (s)\n"
        );
    }

    #[test]
    fn test_write_table_file_creates_dirs_and_replaces() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("data").join("raw").join("raw_data.csv");

        write_table_file(&path, &make_table(), "").unwrap();
        let empty = Table::with_columns(&["key"]);
        write_table_file(&path, &empty, "").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "key\n");
        assert!(!path.with_extension("csv.tmp").exists());
    }
}

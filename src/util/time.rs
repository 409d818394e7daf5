//! Time and date parsing utilities.

use crate::error::{Result, SnapshotError};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

/// Jira's timestamp shape: `2023-01-05T10:15:30.000+0000`.
const TRACKER_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// Parse a timestamp as reported by the tracker.
///
/// Supports:
/// - Jira: `2023-01-05T10:15:30.000+0000`
/// - RFC3339: `2023-01-05T10:15:30Z`, `2023-01-05T10:15:30+00:00`
#[must_use]
pub fn parse_tracker_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    DateTime::parse_from_str(s, TRACKER_TIMESTAMP)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .ok()
}

/// Reduce a date or timestamp string to its calendar date.
///
/// Timestamps keep the date in their own offset; no conversion to UTC
/// happens, so `2023-01-05T23:30:00.000-0500` stays on the 5th.
///
/// Supports everything [`parse_tracker_timestamp`] does, plus:
/// - Simple date: `2023-01-05`
/// - Naive datetime: `2023-01-05 10:15:30`, `2023-01-05T10:15:30`
#[must_use]
pub fn parse_calendar_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    if let Some(dt) = parse_tracker_timestamp(s) {
        return Some(dt.date_naive());
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }

    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

/// Validate a JQL `created >=` floor.
///
/// Accepts an absolute date (`2023-01-01`) or a JQL relative offset
/// (`-30d`, `-2w`, `-12h`, `-90m`). Returns the trimmed floor unchanged.
///
/// # Errors
///
/// Returns a validation error naming `field_name` if the floor is neither.
pub fn validate_created_floor(s: &str, field_name: &str) -> Result<String> {
    let s = s.trim();

    if NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() {
        return Ok(s.to_string());
    }

    if let Some(rest) = s.strip_prefix('-') {
        if let Some(unit_char) = rest.chars().last() {
            let amount_str = &rest[..rest.len() - unit_char.len_utf8()];
            if amount_str.parse::<u32>().is_ok() {
                return match unit_char {
                    'm' | 'h' | 'd' | 'w' => Ok(s.to_string()),
                    _ => Err(SnapshotError::validation(
                        field_name,
                        "invalid unit (use m, h, d, w)",
                    )),
                };
            }
        }
    }

    Err(SnapshotError::validation(
        field_name,
        "invalid date floor (try: 2023-01-01 or -30d)",
    ))
}

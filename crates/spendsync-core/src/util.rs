//! Shared utility functions used across multiple modules.

use chrono::{DateTime, NaiveDate};

use crate::error::{Error, Result};

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Check if a string starts with `http://` or `https://`.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Current Unix timestamp in milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Normalize an event date to `YYYY-MM-DD`.
///
/// Accepts plain calendar dates and RFC 3339 timestamps (the remote store
/// serializes dates as full timestamps).
pub fn normalize_date(value: &str) -> Result<String> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.format("%Y-%m-%d").to_string());
    }
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.date_naive().format("%Y-%m-%d").to_string())
        .map_err(|_| Error::InvalidInput(format!("invalid date '{}'", compact_text(value))))
}

/// Month bucket (`YYYY-MM`) for a normalized date.
pub fn month_of(date: &str) -> String {
    date.chars().take(7).collect()
}

/// Amount expressed in whole cents, used for approximate amount matching.
#[allow(clippy::cast_possible_truncation)]
pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

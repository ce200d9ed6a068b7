//! Timestamp display.
//!
//! Backend timestamps are whatever the agents recorded: RFC 3339 strings,
//! naive ISO strings, occasionally epoch milliseconds. Formatting never fails;
//! anything that cannot be parsed is shown as received.

use serde_json::Value;
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// Shown for a missing timestamp.
pub const TIMESTAMP_PLACEHOLDER: &str = "N/A";

const DISPLAY_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day].[month].[year], [hour]:[minute]:[second]");

const NAIVE_FORMATS: [&[BorrowedFormatItem<'static>]; 4] = [
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
];

/// Render a backend timestamp as `DD.MM.YYYY, HH:MM:SS`.
///
/// Null, empty and other falsy values give [`TIMESTAMP_PLACEHOLDER`].
/// Unparseable input is returned unchanged.
pub fn format_timestamp(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => TIMESTAMP_PLACEHOLDER.to_string(),
        Value::String(s) if s.is_empty() => TIMESTAMP_PLACEHOLDER.to_string(),
        Value::String(s) => format_str(s).unwrap_or_else(|| s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => TIMESTAMP_PLACEHOLDER.to_string(),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|ms| ms.trunc() as i64))
            .and_then(from_epoch_millis)
            .and_then(|dt| dt.format(DISPLAY_FORMAT).ok())
            .unwrap_or_else(|| n.to_string()),
        other => other.to_string(),
    }
}

/// Same as [`format_timestamp`] for a plain string.
pub fn format_timestamp_str(value: &str) -> String {
    if value.is_empty() {
        return TIMESTAMP_PLACEHOLDER.to_string();
    }
    format_str(value).unwrap_or_else(|| value.to_string())
}

fn format_str(s: &str) -> Option<String> {
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
        return dt.format(DISPLAY_FORMAT).ok();
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| PrimitiveDateTime::parse(s, format).ok())
        .and_then(|dt| dt.format(DISPLAY_FORMAT).ok())
}

fn from_epoch_millis(ms: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).ok()
}

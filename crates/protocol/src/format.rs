//! Display formatting shared by listings and detail views.

use chrono::{DateTime, TimeZone};

/// Bytes per binary megabyte.
const MEGABYTE: f64 = 1_048_576.0;

/// Lines shown by a changelog preview.
pub const CHANGELOG_PREVIEW_LINES: usize = 3;

/// Formats a byte count as binary megabytes with one decimal (`"1.5 MB"`).
pub fn format_size(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / MEGABYTE)
}

/// Formats a timestamp as `YYYY-MM-DD HH:MM`.
pub fn format_time<Tz>(ts: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    ts.format("%Y-%m-%d %H:%M").to_string()
}

/// Splits changelog text into lines.
///
/// Clients often submit the two-character escape `\n` instead of a real
/// newline; when the escape is present it wins. Empty text has no lines.
pub fn split_changelog(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    if text.contains("\\n") {
        text.split("\\n").map(str::to_string).collect()
    } else if text.contains('\n') {
        text.split('\n').map(str::to_string).collect()
    } else {
        vec![text.to_string()]
    }
}

/// Returns at most the first [`CHANGELOG_PREVIEW_LINES`] lines.
pub fn preview_changelog(lines: &[String]) -> &[String] {
    &lines[..lines.len().min(CHANGELOG_PREVIEW_LINES)]
}

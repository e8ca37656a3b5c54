// src/feed/normalize.rs
//! Text helpers shared by the source adapters.

use chrono::{DateTime, Utc};

/// Cap for long-form bodies (PR/issue/release text, descriptions).
pub const LONG_FORM_MAX_CHARS: usize = 200;

/// Truncate to at most `max` chars without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// First line of a (commit) message, trimmed.
pub fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or_default().trim()
}

/// Use `text` when it has visible content, else the placeholder.
pub fn content_or(text: Option<&str>, placeholder: &str) -> String {
    match text {
        Some(t) if !t.trim().is_empty() => t.to_string(),
        _ => placeholder.to_string(),
    }
}

/// Long-form body: truncated, or the placeholder when missing/blank.
pub fn long_form_or(text: Option<&str>, placeholder: &str) -> String {
    match text {
        Some(t) if !t.trim().is_empty() => truncate_chars(t, LONG_FORM_MAX_CHARS),
        _ => placeholder.to_string(),
    }
}

/// Non-empty trimmed string or `None`.
pub fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|t| !t.is_empty())
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

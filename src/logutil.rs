//! Helpers for logging catalog-sourced text.
//!
//! Quest names and objective descriptions come from an external data feed and
//! may carry newlines or control characters. Everything logged from the catalog
//! goes through [`escape_log`] so one event stays on one line.

const MAX_PREVIEW: usize = 200;

/// Escape control characters and cap the length of `s` for a single log line.
///
/// Newlines, carriage returns, tabs and backslashes get their usual escapes;
/// any other control character is written as `\u{..}`.
pub fn escape_log(s: &str) -> String {
    escape_log_with_limit(s, MAX_PREVIEW)
}

pub fn escape_log_with_limit(s: &str, limit: usize) -> String {
    let mut out = String::with_capacity(s.len().min(limit) + 4);
    for (count, ch) in s.chars().enumerate() {
        if count >= limit {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.extend(c.escape_unicode()),
            c => out.push(c),
        }
    }
    out
}

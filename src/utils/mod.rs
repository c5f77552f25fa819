//! Utility functions and helpers.

pub mod http;
pub mod time;
pub mod url;

/// Collapse runs of whitespace (including non-breaking spaces) into one space.
pub fn normalize_whitespace(s: &str) -> String {
    s.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

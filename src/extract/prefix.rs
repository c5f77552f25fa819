//! Course catalog page: department prefix token.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

use super::{parse_selector, text_of};
use crate::error::Result;

static COURSE_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z]{2,6})\s?\d{3,4}\b").expect("valid course title regex")
});

/// Prefix such as `CENG` from a heading like `CENG111 Introduction to ...`.
///
/// Headings are searched from `h1` down to `h3`, then the page title.
pub fn extract_prefix(document: &Html) -> Result<Option<String>> {
    for tag in ["h1", "h2", "h3", "title"] {
        let sel = parse_selector(tag)?;
        for element in document.select(&sel) {
            let text = text_of(element);
            if let Some(caps) = COURSE_TITLE.captures(&text) {
                return Ok(Some(caps[1].to_string()));
            }
        }
    }
    Ok(None)
}

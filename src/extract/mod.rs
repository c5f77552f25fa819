//! HTML extraction grammar for the catalog pages.
//!
//! Pure functions from parsed markup to typed records. Nothing here touches
//! the network or storage; structural failures surface as recoverable crawl
//! errors tagged with the stage that failed.

mod courses;
mod departments;
mod musts;
mod prefix;
mod sections;

pub use courses::{any_course, extract_courses};
pub use departments::{extract_current_semester, extract_departments};
pub use musts::extract_dept_node;
pub use prefix::extract_prefix;
pub use sections::extract_sections;

use scraper::{ElementRef, Selector};

use crate::error::{AppError, Result};
use crate::utils::normalize_whitespace;

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Direct `<td>` children of a row.
fn row_cells<'a>(row: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "td")
        .collect()
}

/// Whitespace-normalized text content of an element.
fn text_of(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selector_valid() {
        assert!(parse_selector("div.field-body").is_ok());
        assert!(parse_selector(r#"input[name="text_course_code"]"#).is_ok());
    }

    #[test]
    fn test_parse_selector_invalid() {
        assert!(parse_selector("[[invalid").is_err());
    }
}

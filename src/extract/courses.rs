//! Department page: course listing.

use std::collections::HashSet;

use scraper::{ElementRef, Html};

use super::{parse_selector, row_cells, text_of};
use crate::error::Result;
use crate::models::CourseListing;

const COURSE_INPUT: &str = r#"input[name="text_course_code"]"#;

/// Nearest enclosing `<tr>` of an element.
fn enclosing_row<'a>(element: ElementRef<'a>) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "tr")
}

/// Whether the department offers any course this semester.
///
/// A page without course rows is a valid "no course" answer, not a failure.
pub fn any_course(document: &Html) -> Result<bool> {
    let input_sel = parse_selector(COURSE_INPUT)?;
    Ok(document
        .select(&input_sel)
        .any(|input| enclosing_row(input).is_some()))
}

/// Course rows in page order, deduplicated by code.
///
/// The code comes from the row's radio input; the name from the third
/// cell, or the second when the row is short.
pub fn extract_courses(document: &Html) -> Result<Vec<CourseListing>> {
    let input_sel = parse_selector(COURSE_INPUT)?;
    let mut seen = HashSet::new();
    let mut courses = Vec::new();

    for input in document.select(&input_sel) {
        let Some(code) = input.value().attr("value").map(str::trim) else {
            continue;
        };
        if code.is_empty() || !seen.insert(code.to_string()) {
            continue;
        }
        let Some(row) = enclosing_row(input) else {
            continue;
        };

        let cells = row_cells(row);
        let name = cells
            .get(2)
            .or_else(|| cells.get(1))
            .map(|cell| text_of(*cell))
            .unwrap_or_default();

        courses.push(CourseListing {
            code: code.to_string(),
            name,
        });
    }

    Ok(courses)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPT_PAGE: &str = r#"
        <form method="post"><table>
          <tr><th></th><th>Code</th><th>Name</th><th>Credit</th></tr>
          <tr>
            <td><input type="radio" name="text_course_code" value="5710111"></td>
            <td>5710111</td><td>Introduction to Computer Engineering</td><td>2</td>
          </tr>
          <tr>
            <td><input type="radio" name="text_course_code" value="5710140"></td>
            <td>5710140</td><td>Discrete
                Computational Structures</td><td>4</td>
          </tr>
        </table></form>"#;

    #[test]
    fn test_extract_courses() {
        let doc = Html::parse_document(DEPT_PAGE);
        assert!(any_course(&doc).unwrap());

        let courses = extract_courses(&doc).unwrap();
        assert_eq!(courses.len(), 2);
        assert_eq!(courses[0].code, "5710111");
        assert_eq!(courses[0].name, "Introduction to Computer Engineering");
        assert_eq!(courses[1].name, "Discrete Computational Structures");
    }

    #[test]
    fn test_no_course_page() {
        let doc = Html::parse_document(
            "<html><body><p>Information about the department could not be found.</p></body></html>",
        );
        assert!(!any_course(&doc).unwrap());
        assert!(extract_courses(&doc).unwrap().is_empty());
    }

    #[test]
    fn test_short_row_uses_second_cell() {
        let doc = Html::parse_document(
            r#"<table><tr><td><input name="text_course_code" value="42"></td><td>Seminar</td></tr></table>"#,
        );
        let courses = extract_courses(&doc).unwrap();
        assert_eq!(courses[0].name, "Seminar");
    }
}

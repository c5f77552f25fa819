//! Landing page: department list and currently selected semester.

use std::collections::HashSet;

use scraper::{ElementRef, Html};

use super::{parse_selector, text_of};
use crate::error::{AppError, CrawlContext, Result};
use crate::models::{CurrentSemester, Department, Prefix};

const DEPARTMENT_SELECT: &str = r#"select[name="select_dept"]"#;
const SEMESTER_SELECT: &str = r#"select[name="select_semester"]"#;

fn find_select<'a>(document: &'a Html, selector: &str, stage: &'static str) -> Result<ElementRef<'a>> {
    let sel = parse_selector(selector)?;
    document.select(&sel).next().ok_or_else(|| {
        AppError::crawl(
            "Expected selector missing from landing page",
            CrawlContext::new().stage(stage).cause(selector),
        )
    })
}

/// Departments in landing-page order. Prefixes start as [`Prefix::Missing`].
pub fn extract_departments(document: &Html) -> Result<Vec<Department>> {
    let select = find_select(document, DEPARTMENT_SELECT, "departments")?;
    let option_sel = parse_selector("option")?;

    let mut seen = HashSet::new();
    let departments = select
        .select(&option_sel)
        .filter_map(|option| {
            let code = option.value().attr("value")?.trim().to_string();
            if code.is_empty() || !seen.insert(code.clone()) {
                return None;
            }
            Some(Department {
                code,
                name: text_of(option),
                prefix: Prefix::Missing,
            })
        })
        .collect();

    Ok(departments)
}

/// The selected semester option, falling back to the first option.
pub fn extract_current_semester(document: &Html) -> Result<CurrentSemester> {
    let select = find_select(document, SEMESTER_SELECT, "semester")?;
    let option_sel = parse_selector("option")?;

    let options: Vec<_> = select.select(&option_sel).collect();
    let chosen = options
        .iter()
        .find(|o| o.value().attr("selected").is_some())
        .or_else(|| options.first())
        .ok_or_else(|| {
            AppError::crawl(
                "Semester selector has no options",
                CrawlContext::new().stage("semester"),
            )
        })?;

    let label = text_of(*chosen);
    let term = chosen
        .value()
        .attr("value")
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| label.clone());

    Ok(CurrentSemester { term, label })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LANDING: &str = r#"
        <html><body><form>
          <select name="select_dept">
            <option value="">-- choose --</option>
            <option value="571">Computer  Engineering</option>
            <option value="120">Mathematics</option>
            <option value="571">Computer Engineering (dup)</option>
          </select>
          <select name="select_semester">
            <option value="20231">2023-2024 Fall</option>
            <option value="20232" selected="selected">2023-2024 Spring</option>
          </select>
        </form></body></html>"#;

    #[test]
    fn test_extract_departments_in_order() {
        let doc = Html::parse_document(LANDING);
        let depts = extract_departments(&doc).unwrap();

        let codes: Vec<_> = depts.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["571", "120"]);
        assert_eq!(depts[0].name, "Computer Engineering");
        assert_eq!(depts[0].prefix, Prefix::Missing);
    }

    #[test]
    fn test_extract_selected_semester() {
        let doc = Html::parse_document(LANDING);
        let semester = extract_current_semester(&doc).unwrap();
        assert_eq!(semester.term, "20232");
        assert_eq!(semester.label, "2023-2024 Spring");
    }

    #[test]
    fn test_semester_falls_back_to_first_option() {
        let doc = Html::parse_document(
            r#"<select name="select_semester"><option value="20241">2024-2025 Fall</option></select>"#,
        );
        assert_eq!(extract_current_semester(&doc).unwrap().term, "20241");
    }

    #[test]
    fn test_missing_department_select_fails_fast() {
        let doc = Html::parse_document("<html><body><p>Maintenance</p></body></html>");
        let err = extract_departments(&doc).unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(err.context().unwrap().stage, Some("departments"));
    }

    #[test]
    fn test_missing_semester_select_fails_fast() {
        let doc = Html::parse_document(r#"<select name="select_dept"></select>"#);
        let err = extract_current_semester(&doc).unwrap_err();
        assert_eq!(err.context().unwrap().stage, Some("semester"));
    }
}

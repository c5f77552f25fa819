//! Course page: sections and their meeting times.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};

use super::{parse_selector, row_cells, text_of};
use crate::error::Result;
use crate::models::{MeetingTime, Section, Sections};
use crate::utils::normalize_whitespace;

const SECTION_INPUT: &str = r#"input[name="submit_section"]"#;

static CLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}[:.]\d{2}$").expect("valid clock regex"));

/// Sections of a course keyed by section identifier.
///
/// A row holding a `submit_section` input opens a section: cell 1 lists
/// instructors, cell 2 the capacity. Rows after it with at least four
/// cells and a clock time in cell 1 are its meeting times
/// (day, start, end, place). Rows wrapping nested tables are ignored.
pub fn extract_sections(document: &Html) -> Result<Sections> {
    let row_sel = parse_selector("tr")?;
    let table_sel = parse_selector("table")?;
    let input_sel = parse_selector(SECTION_INPUT)?;

    let mut sections = Sections::new();
    let mut current: Option<String> = None;

    for row in document.select(&row_sel) {
        if row.select(&table_sel).next().is_some() {
            continue;
        }
        let cells = row_cells(row);

        if let Some(input) = row.select(&input_sel).next() {
            let id = input.value().attr("value").unwrap_or("").trim().to_string();
            if id.is_empty() {
                current = None;
                continue;
            }
            let section = Section {
                instructors: cells.get(1).map(|c| instructors(*c)).unwrap_or_default(),
                capacity: cells.get(2).and_then(|c| text_of(*c).parse().ok()),
                times: Vec::new(),
            };
            sections.insert(id.clone(), section);
            current = Some(id);
            continue;
        }

        let Some(id) = current.as_ref() else {
            continue;
        };
        if let Some(time) = meeting_time(&cells) {
            if let Some(section) = sections.get_mut(id) {
                section.times.push(time);
            }
        }
    }

    Ok(sections)
}

fn instructors(cell: ElementRef<'_>) -> Vec<String> {
    cell.text()
        .flat_map(|chunk| chunk.split(','))
        .map(normalize_whitespace)
        .filter(|name| !name.is_empty())
        .collect()
}

fn meeting_time(cells: &[ElementRef<'_>]) -> Option<MeetingTime> {
    if cells.len() < 4 {
        return None;
    }
    let field = |i: usize| text_of(cells[i]);
    let start = field(1);
    if !CLOCK.is_match(&start) {
        return None;
    }
    Some(MeetingTime {
        day: field(0),
        start,
        end: field(2),
        place: field(3),
    })
}

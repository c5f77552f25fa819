//! Curriculum page: must courses per semester.

use scraper::Html;

use super::parse_selector;
use crate::error::{AppError, CrawlContext, Result};
use crate::models::MustNode;
use crate::utils::url::extract_course_code;

/// Cells in a well-formed curriculum row.
const ROW_WIDTH: usize = 6;

/// Must-course codes per semester, numbered from 1 in table order.
///
/// The last table under `div.field-body` is not a semester and is dropped,
/// as is each table's header row. The first row whose cell count is not
/// [`ROW_WIDTH`] ends its table. Rows whose first cell has no course link
/// with a `course_code` parameter are dropped, and semesters left without
/// codes get no entry.
pub fn extract_dept_node(document: &Html) -> Result<MustNode> {
    let body_sel = parse_selector("div.field-body")?;
    let table_sel = parse_selector("table")?;
    let row_sel = parse_selector("tr")?;
    let cell_sel = parse_selector("td")?;
    let link_sel = parse_selector("a[href]")?;

    let body = document.select(&body_sel).next().ok_or_else(|| {
        AppError::crawl(
            "Failed to extract the node",
            CrawlContext::new().stage("musts").cause("div.field-body not found"),
        )
    })?;

    let tables: Vec<_> = body.select(&table_sel).collect();
    let semester_tables = &tables[..tables.len().saturating_sub(1)];

    let mut node = MustNode::new();
    for (sem_no, table) in (1u32..).zip(semester_tables) {
        let mut courses = Vec::new();

        for row in table.select(&row_sel).skip(1) {
            let cells: Vec<_> = row.select(&cell_sel).collect();
            if cells.is_empty() {
                continue;
            }
            if cells.len() != ROW_WIDTH {
                break;
            }

            let code = cells[0]
                .select(&link_sel)
                .next()
                .and_then(|link| link.value().attr("href"))
                .and_then(extract_course_code);
            if let Some(code) = code {
                courses.push(code);
            }
        }

        if !courses.is_empty() {
            node.insert(sem_no, courses);
        }
    }

    Ok(node)
}

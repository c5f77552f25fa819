// src/services/catalog.rs

//! Catalog page client.
//!
//! Pairs each catalog endpoint with its extraction rule. Every method issues
//! exactly one fetch and parses the body synchronously afterwards, so parsed
//! documents never live across an await point.

use scraper::Html;

use crate::error::{CrawlContext, Result};
use crate::extract;
use crate::models::{CatalogConfig, CourseListing, CurrentSemester, Department, MustNode, Sections};
use crate::utils::http::PageFetcher;

/// Client for the fixed set of catalog pages.
pub struct CatalogClient<'a> {
    fetcher: &'a dyn PageFetcher,
    catalog: &'a CatalogConfig,
}

impl<'a> CatalogClient<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, catalog: &'a CatalogConfig) -> Self {
        Self { fetcher, catalog }
    }

    /// Departments and the current semester from the landing page.
    pub async fn landing(&self) -> Result<(Vec<Department>, CurrentSemester)> {
        let context = CrawlContext::new().stage("landing");
        let body = self.fetcher.fetch(&self.catalog.main_page_url, &context).await?;

        let document = Html::parse_document(&body);
        let departments = extract::extract_departments(&document)?;
        let semester = extract::extract_current_semester(&document)?;
        Ok((departments, semester))
    }

    /// Courses of a department, or `None` when it lists no course.
    pub async fn department_courses(
        &self,
        dept_code: &str,
        semester: &str,
    ) -> Result<Option<Vec<CourseListing>>> {
        let context = CrawlContext::new().stage("department").dept(dept_code);
        let url = self.catalog.department(dept_code, semester);
        let body = self.fetcher.fetch(&url, &context).await?;

        let document = Html::parse_document(&body);
        if !extract::any_course(&document)? {
            return Ok(None);
        }
        let courses = extract::extract_courses(&document)?;
        Ok((!courses.is_empty()).then_some(courses))
    }

    /// Sections of one course.
    pub async fn course_sections(&self, dept_code: &str, course_code: &str) -> Result<Sections> {
        let context = CrawlContext::new()
            .stage("course")
            .dept(dept_code)
            .course(course_code);
        let body = self
            .fetcher
            .fetch(&self.catalog.course(course_code), &context)
            .await?;

        extract::extract_sections(&Html::parse_document(&body))
    }

    /// Prefix token from the catalog page of one of the department's courses.
    pub async fn probe_prefix(&self, dept_code: &str, course_code: &str) -> Result<Option<String>> {
        let context = CrawlContext::new()
            .stage("prefix")
            .dept(dept_code)
            .course(course_code);
        let body = self
            .fetcher
            .fetch(&self.catalog.prefix_probe(course_code), &context)
            .await?;

        extract::extract_prefix(&Html::parse_document(&body))
    }

    /// Must courses per semester from the department's curriculum page.
    pub async fn must_courses(&self, dept_code: &str) -> Result<MustNode> {
        let context = CrawlContext::new().stage("musts").dept(dept_code);
        let body = self
            .fetcher
            .fetch(&self.catalog.program(dept_code), &context)
            .await?;

        extract::extract_dept_node(&Html::parse_document(&body))
            .map_err(|e| e.into_crawl("Failed to extract must courses", context))
    }
}

// src/pipeline/scrape.rs

//! Full catalog scrape: departments, courses and sections.

use std::collections::BTreeMap;

use chrono::Utc;

use super::{Publisher, RunContext, RunGuard};
use crate::error::{AppError, CrawlContext, Result};
use crate::models::{
    Course, CourseData, CurrentSemester, Department, DepartmentRecord, DepartmentRegistry,
    LastUpdated, Prefix, RunOutcome, Workflow,
};
use crate::services::{CatalogClient, PrefixResolver, PrefixTable};
use crate::storage::read_json;
use crate::utils::time::format_istanbul;

/// Departments between two progress lines.
const PROGRESS_EVERY: usize = 10;

/// Counters of a finished scrape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeSummary {
    pub departments: usize,
    pub departments_without_courses: usize,
    pub courses: usize,
    pub sections: usize,
    /// Courses whose numeric code was already taken by another department
    pub collisions: usize,
    pub unresolved_prefixes: usize,
}

/// Run a scrape under the single-flight guard.
pub async fn run_scrape(ctx: &RunContext<'_>) -> Result<RunOutcome> {
    let guard = RunGuard::new(ctx.store, &ctx.config.storage);
    guard.guarded(Workflow::Scrape, scrape(ctx)).await
}

/// Crawl the whole catalog and publish the datasets. Does not touch the
/// status marker.
///
/// The staging batch is opened before the first request, so a run that
/// cannot stage never reaches the catalog.
pub async fn scrape(ctx: &RunContext<'_>) -> Result<ScrapeSummary> {
    log::info!("Starting the scraping process");
    let storage = &ctx.config.storage;
    let publisher = Publisher::new(ctx.store, storage);
    let mut batch = publisher.stage(Workflow::Scrape)?;

    let prior = load_prior_registry(ctx).await?;
    let manual = load_manual_prefixes(ctx).await?;
    let no_overrides = BTreeMap::new();
    let overrides = manual.as_ref().map_or(&no_overrides, |m| &m.prefixes);
    let mut prefixes = PrefixTable::seeded(&prior, overrides);

    let client = CatalogClient::new(ctx.fetcher, &ctx.config.catalog);
    let resolver = PrefixResolver::new(&client);

    let (mut departments, semester) = client.landing().await?;
    log::info!(
        "Found {} departments, semester {} ({})",
        departments.len(),
        semester.label,
        semester.term
    );

    let mut data = CourseData::new();
    let mut summary = ScrapeSummary {
        departments: departments.len(),
        ..ScrapeSummary::default()
    };

    let total = departments.len();
    for (index, dept) in departments.iter().enumerate() {
        crawl_department(
            &client, &resolver, &mut prefixes, dept, &semester, &mut data, &mut summary,
        )
        .await
        .map_err(|e| e.into_crawl("Failed to process dept", CrawlContext::new().dept(&dept.code)))?;

        let done = index + 1;
        if done % PROGRESS_EVERY == 0 {
            log::info!(
                "completed {:.2}% ({}/{})",
                done as f64 / total as f64 * 100.0,
                done,
                total
            );
        }
    }

    for dept in &mut departments {
        dept.prefix = prefixes.prefix_of(&dept.code);
    }
    let registry: DepartmentRegistry = departments
        .iter()
        .map(|dept| (dept.code.clone(), DepartmentRecord::from(dept)))
        .collect();
    let no_prefix: DepartmentRegistry = registry
        .iter()
        .filter(|(_, record)| !record.prefix.is_usable())
        .map(|(code, record)| (code.clone(), record.clone()))
        .collect();

    summary.courses = data.len();
    summary.unresolved_prefixes = no_prefix
        .values()
        .filter(|record| record.prefix == Prefix::Unresolved)
        .count();

    let last_updated = LastUpdated {
        term: format!("{}:{}", semester.term, semester.label),
        updated: format_istanbul(Utc::now()),
    };

    batch.add(&storage.departments_noprefix, &no_prefix).await?;
    batch.add(&storage.departments, &registry).await?;
    batch.add(&storage.data, &data).await?;
    batch.add(&storage.last_updated, &last_updated).await?;
    if let Some(manual) = manual.as_ref().filter(|m| m.from_file) {
        batch.add(&storage.manual_prefixes, &manual.prefixes).await?;
    }
    publisher.commit(batch).await?;

    log::info!(
        "Scraping finished: {} departments ({} without courses), {} courses, {} sections, \
         {} collisions, {} unresolved prefixes",
        summary.departments,
        summary.departments_without_courses,
        summary.courses,
        summary.sections,
        summary.collisions,
        summary.unresolved_prefixes
    );
    Ok(summary)
}

async fn crawl_department(
    client: &CatalogClient<'_>,
    resolver: &PrefixResolver<'_, '_>,
    prefixes: &mut PrefixTable,
    dept: &Department,
    semester: &CurrentSemester,
    data: &mut CourseData,
    summary: &mut ScrapeSummary,
) -> Result<()> {
    let Some(courses) = client.department_courses(&dept.code, &semester.term).await? else {
        log::debug!("{} lists no course", dept.code);
        prefixes.mark_no_course(&dept.code);
        summary.departments_without_courses += 1;
        return Ok(());
    };

    if prefixes.needs_probe(&dept.code) {
        let prefix = resolver.resolve(&dept.code, &courses).await?;
        prefixes.set(&dept.code, prefix);
    }
    let prefix = prefixes.prefix_of(&dept.code);

    for listing in &courses {
        let key: u64 = listing.code.parse().map_err(|e| {
            AppError::crawl(
                "Course code is not numeric",
                CrawlContext::new()
                    .stage("course")
                    .dept(&dept.code)
                    .course(&listing.code)
                    .cause(e),
            )
        })?;

        let sections = client.course_sections(&dept.code, &listing.code).await?;
        summary.sections += sections.len();

        let course = Course {
            code: listing.code.clone(),
            name: Course::display_name(&prefix, &listing.code, &listing.name),
            sections,
        };
        if data.insert(key, course).is_some() {
            summary.collisions += 1;
            log::warn!(
                "Course {} listed again under {}, keeping the later entry",
                listing.code,
                dept.code
            );
        }
    }

    Ok(())
}

/// Previously published registry. An unreadable one is treated as empty.
async fn load_prior_registry(ctx: &RunContext<'_>) -> Result<DepartmentRegistry> {
    let key = ctx.config.storage.key(&ctx.config.storage.departments);
    match read_json::<DepartmentRegistry>(ctx.store, &key).await {
        Ok(registry) => Ok(registry.unwrap_or_default()),
        Err(AppError::Json(e)) => {
            log::warn!("Ignoring unreadable {}: {}", ctx.store.location(&key), e);
            Ok(DepartmentRegistry::new())
        }
        Err(e) => Err(e),
    }
}

/// Operator prefix overrides and where they came from.
struct ManualPrefixes {
    prefixes: BTreeMap<String, String>,
    from_file: bool,
}

/// Overrides from the configured local file, else from the store.
async fn load_manual_prefixes(ctx: &RunContext<'_>) -> Result<Option<ManualPrefixes>> {
    let storage = &ctx.config.storage;
    let unreadable = |e: &dyn std::fmt::Display| {
        AppError::crawl(
            "Failed to load manual prefixes",
            CrawlContext::new().stage("manual_prefixes").cause(e),
        )
    };

    let (bytes, from_file) = match &storage.manual_prefixes_file {
        Some(path) => (
            Some(tokio::fs::read(path).await.map_err(|e| unreadable(&e))?),
            true,
        ),
        None => (
            ctx.store
                .get(&storage.key(&storage.manual_prefixes))
                .await?,
            false,
        ),
    };

    let Some(bytes) = bytes else {
        return Ok(None);
    };
    let prefixes: BTreeMap<String, String> =
        serde_json::from_slice(&bytes).map_err(|e| unreadable(&e))?;
    Ok(Some(ManualPrefixes {
        prefixes,
        from_file,
    }))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::models::Config;
    use crate::storage::{ArtifactStore, LocalStorage};
    use crate::utils::http::PageFetcher;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct NoPages;

    #[async_trait]
    impl PageFetcher for NoPages {
        async fn fetch(&self, _url: &str, context: &CrawlContext) -> Result<String> {
            Err(AppError::crawl("offline", context.clone()))
        }
    }

    /// Serves fixed bodies by URL; anything else is an offline page.
    #[derive(Default)]
    struct Pages {
        bodies: HashMap<String, String>,
        calls: AtomicUsize,
    }

    impl Pages {
        fn with(mut self, url: String, body: &str) -> Self {
            self.bodies.insert(url, body.to_string());
            self
        }
    }

    #[async_trait]
    impl PageFetcher for Pages {
        async fn fetch(&self, url: &str, context: &CrawlContext) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.bodies
                .get(url)
                .cloned()
                .ok_or_else(|| AppError::crawl("offline", context.clone()))
        }
    }

    const LANDING: &str = r#"
<html><body><form>
  <select name="select_dept">
    <option value="1">Department A</option>
    <option value="2">Department B</option>
  </select>
  <select name="select_semester">
    <option value="20241" selected>2024-2025 Fall</option>
  </select>
</form></body></html>"#;

    const NO_HEADING: &str = "<html><body><h1>Course not found</h1></body></html>";
    const NO_SECTIONS: &str = "<html><body></body></html>";

    fn listing(code: &str, name: &str) -> String {
        format!(
            r#"<html><body><table>
  <tr><td><input type="radio" name="text_course_code" value="{code}"></td>
      <td>{code}</td><td>{name}</td></tr>
</table></body></html>"#
        )
    }

    #[tokio::test]
    async fn test_unreadable_prior_registry_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = LocalStorage::new(dir.path());
        store
            .put("departments.json", b"not json".to_vec())
            .await
            .unwrap();
        let config = Config::default();
        let ctx = RunContext::new(&config, &store, &NoPages);

        assert!(load_prior_registry(&ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_manual_prefixes_from_local_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("overrides.json");
        std::fs::write(&path, r#"{"120":"PHYS"}"#).unwrap();

        let store = LocalStorage::new(dir.path().join("store"));
        store
            .put("manualPrefixes.json", br#"{"120":"IGNORED"}"#.to_vec())
            .await
            .unwrap();
        let mut config = Config::default();
        config.storage.manual_prefixes_file = Some(path.to_string_lossy().into_owned());
        let ctx = RunContext::new(&config, &store, &NoPages);

        let manual = load_manual_prefixes(&ctx).await.unwrap().unwrap();
        assert!(manual.from_file);
        assert_eq!(manual.prefixes["120"], "PHYS");
    }

    #[tokio::test]
    async fn test_malformed_manual_prefixes_are_recoverable() {
        let dir = TempDir::new().unwrap();
        let store = LocalStorage::new(dir.path());
        store
            .put("manualPrefixes.json", b"[1, 2]".to_vec())
            .await
            .unwrap();
        let config = Config::default();
        let ctx = RunContext::new(&config, &store, &NoPages);

        let err = load_manual_prefixes(&ctx).await.err().unwrap();
        assert!(err.is_recoverable());
        assert_eq!(err.context().unwrap().stage, Some("manual_prefixes"));
    }

    #[tokio::test]
    async fn test_landing_failure_aborts_before_publish() {
        let dir = TempDir::new().unwrap();
        let store = LocalStorage::new(dir.path());
        let config = Config::default();
        let ctx = RunContext::new(&config, &store, &NoPages);

        let err = scrape(&ctx).await.unwrap_err();
        assert_eq!(err.context().unwrap().stage, Some("landing"));
        assert!(!store.exists("data.json").await.unwrap());
        assert!(!store.exists("manifest.json").await.unwrap());
    }

    #[tokio::test]
    async fn test_colliding_course_codes_keep_later_department() {
        let dir = TempDir::new().unwrap();
        let store = LocalStorage::new(dir.path());
        let config = Config::default();
        let catalog = &config.catalog;
        let pages = Pages::default()
            .with(catalog.main_page_url.clone(), LANDING)
            .with(catalog.department("1", "20241"), &listing("77", "FromA"))
            .with(catalog.department("2", "20241"), &listing("077", "FromB"))
            .with(catalog.prefix_probe("77"), NO_HEADING)
            .with(catalog.prefix_probe("077"), NO_HEADING)
            .with(catalog.course("77"), NO_SECTIONS)
            .with(catalog.course("077"), NO_SECTIONS);
        let ctx = RunContext::new(&config, &store, &pages);

        let summary = scrape(&ctx).await.unwrap();
        assert_eq!(summary.collisions, 1);
        assert_eq!(summary.courses, 1);
        assert_eq!(summary.unresolved_prefixes, 2);

        let data: CourseData = read_json(&store, "data.json").await.unwrap().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[&77u64].code, "077");
        assert_eq!(data[&77u64].name, "077 - FromB");
    }

    #[tokio::test]
    async fn test_non_numeric_course_code_is_tagged() {
        let dir = TempDir::new().unwrap();
        let store = LocalStorage::new(dir.path());
        let config = Config::default();
        let catalog = &config.catalog;
        let pages = Pages::default()
            .with(catalog.main_page_url.clone(), LANDING)
            .with(catalog.department("1", "20241"), &listing("CENG1x", "Broken"))
            .with(catalog.prefix_probe("CENG1x"), NO_HEADING);
        let ctx = RunContext::new(&config, &store, &pages);

        let err = scrape(&ctx).await.unwrap_err();
        assert!(err.is_recoverable());
        assert!(err.to_string().starts_with("Failed to process dept"));
        let ctx = err.context().unwrap();
        assert_eq!(ctx.stage, Some("course"));
        assert_eq!(ctx.dept_code.as_deref(), Some("1"));
        assert_eq!(ctx.course_code.as_deref(), Some("CENG1x"));
        assert!(ctx.cause.as_deref().unwrap().starts_with("Course code is not numeric"));
        assert_eq!(pages.calls.load(Ordering::SeqCst), 3);
        assert!(!store.exists("data.json").await.unwrap());
    }

    #[tokio::test]
    async fn test_staging_failure_precedes_any_fetch() {
        let dir = TempDir::new().unwrap();
        let store = LocalStorage::new(dir.path().join("store"));
        let mut config = Config::default();
        config.storage.staging_dir =
            Some(dir.path().join("missing").to_string_lossy().into_owned());
        let pages = Pages::default().with(config.catalog.main_page_url.clone(), LANDING);
        let ctx = RunContext::new(&config, &store, &pages);

        let err = scrape(&ctx).await.unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
        assert_eq!(pages.calls.load(Ordering::SeqCst), 0);
    }
}

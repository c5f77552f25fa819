// src/pipeline/musts.rs

//! Must-course crawl over the published department registry.

use super::{Publisher, RunContext, RunGuard};
use crate::error::{AppError, CrawlContext, Result};
use crate::models::{DepartmentRegistry, MustData, RunOutcome, Workflow};
use crate::services::CatalogClient;
use crate::storage::read_json;

const PROGRESS_EVERY: usize = 10;

/// Counters of a finished musts run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MustsSummary {
    pub crawled: usize,
    /// Departments without a usable prefix
    pub skipped: usize,
}

/// Run the musts crawl under the single-flight guard.
pub async fn run_musts(ctx: &RunContext<'_>) -> Result<RunOutcome> {
    let guard = RunGuard::new(ctx.store, &ctx.config.storage);
    guard.guarded(Workflow::Musts, musts(ctx)).await
}

/// Crawl must courses for every department with a resolved prefix and
/// publish them keyed by prefix.
pub async fn musts(ctx: &RunContext<'_>) -> Result<MustsSummary> {
    log::info!("Starting the process to fetch must courses");
    let storage = &ctx.config.storage;
    let publisher = Publisher::new(ctx.store, storage);
    let mut batch = publisher.stage(Workflow::Musts)?;

    let registry = load_registry(ctx).await?;
    let client = CatalogClient::new(ctx.fetcher, &ctx.config.catalog);

    let mut data = MustData::new();
    let mut summary = MustsSummary::default();
    let total = registry.len();

    for (index, (dept_code, record)) in registry.iter().enumerate() {
        if !record.prefix.is_usable() {
            summary.skipped += 1;
            continue;
        }

        let node = client.must_courses(dept_code).await?;
        if node.is_empty() {
            log::debug!("{} ({}) has no must courses", dept_code, record.prefix);
        }
        data.insert(record.prefix.to_string(), node);
        summary.crawled += 1;

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

    batch.add(&storage.musts, &data).await?;
    publisher.commit(batch).await?;

    log::info!(
        "Must courses fetched for {} departments, {} skipped",
        summary.crawled,
        summary.skipped
    );
    Ok(summary)
}

/// The published registry. Absent, empty or unreadable ends the run before
/// any page is fetched.
async fn load_registry(ctx: &RunContext<'_>) -> Result<DepartmentRegistry> {
    let key = ctx.config.storage.key(&ctx.config.storage.departments);
    let context = CrawlContext::new().stage("registry");

    match read_json::<DepartmentRegistry>(ctx.store, &key).await {
        Ok(Some(registry)) if !registry.is_empty() => Ok(registry),
        Ok(_) => Err(AppError::crawl(
            "No departments found",
            context.cause(format!("{} is missing or empty", ctx.store.location(&key))),
        )),
        Err(AppError::Json(e)) => Err(AppError::crawl("No departments found", context.cause(e))),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    use super::*;
    use crate::storage::{ArtifactStore, LocalStorage};
    use crate::models::Config;
    use crate::utils::http::PageFetcher;

    #[derive(Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageFetcher for CountingFetcher {
        async fn fetch(&self, _url: &str, _context: &CrawlContext) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(r#"<div class="field-body"><table></table></div>"#.to_string())
        }
    }

    #[tokio::test]
    async fn test_empty_registry_fails_before_fetch() {
        let dir = TempDir::new().unwrap();
        let store = LocalStorage::new(dir.path());
        store.put("departments.json", b"{}".to_vec()).await.unwrap();
        let config = Config::default();
        let fetcher = CountingFetcher::default();
        let ctx = RunContext::new(&config, &store, &fetcher);

        let err = musts(&ctx).await.unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(err.context().unwrap().stage, Some("registry"));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_node_still_published() {
        let dir = TempDir::new().unwrap();
        let store = LocalStorage::new(dir.path());
        store
            .put(
                "departments.json",
                br#"{"571":{"n":"Computer Engineering","p":"CENG"},"120":{"n":"Physics","p":"-"}}"#
                    .to_vec(),
            )
            .await
            .unwrap();
        let config = Config::default();
        let fetcher = CountingFetcher::default();
        let ctx = RunContext::new(&config, &store, &fetcher);

        let summary = musts(&ctx).await.unwrap();
        assert_eq!(summary, MustsSummary { crawled: 1, skipped: 1 });
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        let data: MustData = read_json(&store, "musts.json").await.unwrap().unwrap();
        assert_eq!(data.keys().collect::<Vec<_>>(), vec!["CENG"]);
        assert!(data["CENG"].is_empty());
    }
}

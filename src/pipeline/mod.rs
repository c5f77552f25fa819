//! Pipeline entry points for crawler operations.
//!
//! - `run_scrape`: Crawl departments, courses and sections and publish them
//! - `run_musts`: Crawl must courses for every department with a known prefix
//!
//! Both entry points run under the [`RunGuard`] single-flight marker.

pub mod guard;
pub mod musts;
pub mod publish;
pub mod scrape;

pub use guard::RunGuard;
pub use musts::{MustsSummary, run_musts};
pub use publish::{Publisher, StagedBatch};
pub use scrape::{ScrapeSummary, run_scrape};

use crate::models::Config;
use crate::storage::ArtifactStore;
use crate::utils::http::PageFetcher;

/// Everything a workflow run needs, borrowed from the caller.
#[derive(Clone, Copy)]
pub struct RunContext<'a> {
    pub config: &'a Config,
    pub store: &'a dyn ArtifactStore,
    pub fetcher: &'a dyn PageFetcher,
}

impl<'a> RunContext<'a> {
    pub fn new(
        config: &'a Config,
        store: &'a dyn ArtifactStore,
        fetcher: &'a dyn PageFetcher,
    ) -> Self {
        Self {
            config,
            store,
            fetcher,
        }
    }
}

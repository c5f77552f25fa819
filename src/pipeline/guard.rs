// src/pipeline/guard.rs

//! Single-flight run guard backed by the `status.json` artifact.

use std::future::Future;

use crate::error::{CrawlContext, Result};
use crate::models::{RunOutcome, RunStatus, StorageConfig, Workflow};
use crate::storage::{ArtifactStore, to_json_bytes};

/// Serializes workflow runs across invocations through the status marker.
pub struct RunGuard<'a> {
    store: &'a dyn ArtifactStore,
    key: String,
}

impl<'a> RunGuard<'a> {
    pub fn new(store: &'a dyn ArtifactStore, storage: &StorageConfig) -> Self {
        Self {
            store,
            key: storage.key(&storage.status),
        }
    }

    /// Current marker. A store without one is idle.
    pub async fn status(&self) -> Result<RunStatus> {
        Ok(self.read().await?.1)
    }

    async fn read(&self) -> Result<(Option<Vec<u8>>, RunStatus)> {
        let bytes = self.store.get(&self.key).await?;
        let status = match &bytes {
            Some(raw) => serde_json::from_slice(raw)?,
            None => RunStatus::IDLE,
        };
        Ok((bytes, status))
    }

    /// Move the marker from idle to busy. Returns `false` if another run holds
    /// it or won the swap.
    pub async fn try_acquire(&self) -> Result<bool> {
        let (current, status) = self.read().await?;
        if status.is_busy() {
            return Ok(false);
        }
        self.store
            .compare_and_swap(&self.key, current.as_deref(), to_json_bytes(&RunStatus::BUSY)?)
            .await
    }

    /// Unconditionally mark the store idle.
    pub async fn release(&self) -> Result<()> {
        self.store
            .put(&self.key, to_json_bytes(&RunStatus::IDLE)?)
            .await
    }

    /// Run `work` while holding the marker.
    ///
    /// `work` is not polled at all when the marker is busy. Crawl failures
    /// release the marker and come back as `"<workflow> process failed"`,
    /// keeping the failed department and course in the context. Any other
    /// error leaves the marker busy for an operator to inspect.
    pub async fn guarded<T, F>(&self, workflow: Workflow, work: F) -> Result<RunOutcome>
    where
        F: Future<Output = Result<T>>,
    {
        if !self.try_acquire().await? {
            log::info!("Another run holds {}, skipping {}", self.key, workflow);
            return Ok(RunOutcome::Busy);
        }

        match work.await {
            Ok(_) => {
                self.release().await?;
                Ok(RunOutcome::Completed)
            }
            Err(e) if e.is_recoverable() => {
                log::error!("{} run failed: {}", workflow, e);
                if let Err(release_err) = self.release().await {
                    log::error!("Failed to reset {}: {}", self.key, release_err);
                }
                Err(e.into_crawl(format!("{workflow} process failed"), CrawlContext::new()))
            }
            Err(e) => {
                log::error!("{} run aborted, {} left busy: {}", workflow, self.key, e);
                Err(e)
            }
        }
    }
}

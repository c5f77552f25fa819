// src/pipeline/publish.rs

//! Staged artifact publishing.
//!
//! A run serializes every artifact into a scoped temporary directory first,
//! uploads them one by one, then commits `manifest.json` last. Readers that
//! follow the manifest never observe a half-published run.

use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tempfile::TempDir;

use crate::error::Result;
use crate::models::{Manifest, ManifestEntry, StorageConfig, Workflow};
use crate::storage::{ArtifactStore, to_json_bytes};

/// Artifacts of one run waiting to be uploaded.
pub struct StagedBatch {
    workflow: Workflow,
    dir: TempDir,
    files: Vec<(String, PathBuf)>,
}

impl StagedBatch {
    /// Serialize `value` as pretty JSON under artifact `name`.
    pub async fn add<T: Serialize + ?Sized>(&mut self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.path().join(name);
        tokio::fs::write(&path, to_json_bytes(value)?).await?;
        self.files.push((name.to_string(), path));
        Ok(())
    }
}

/// Uploads staged batches to the artifact store.
pub struct Publisher<'a> {
    store: &'a dyn ArtifactStore,
    storage: &'a StorageConfig,
}

impl<'a> Publisher<'a> {
    pub fn new(store: &'a dyn ArtifactStore, storage: &'a StorageConfig) -> Self {
        Self { store, storage }
    }

    /// Open an empty batch backed by a fresh temporary directory.
    pub fn stage(&self, workflow: Workflow) -> Result<StagedBatch> {
        let dir = match &self.storage.staging_dir {
            Some(parent) => TempDir::new_in(parent)?,
            None => TempDir::new()?,
        };
        Ok(StagedBatch {
            workflow,
            dir,
            files: Vec::new(),
        })
    }

    /// Upload every staged artifact, then the manifest pointing at them.
    pub async fn commit(&self, batch: StagedBatch) -> Result<Manifest> {
        let published_at = Utc::now();
        let mut artifacts = Vec::with_capacity(batch.files.len());

        for (name, path) in &batch.files {
            let bytes = tokio::fs::read(path).await?;
            let key = self.storage.key(name);
            let entry = ManifestEntry {
                key: key.clone(),
                sha256: hex::encode(Sha256::digest(&bytes)),
                bytes: bytes.len(),
            };

            self.store.put(&key, bytes).await?;
            log::info!("Uploaded {}", self.store.location(&key));
            artifacts.push(entry);
        }

        let manifest = Manifest {
            run_id: format!("{}-{}", published_at.format("%Y%m%dT%H%M%SZ"), batch.workflow),
            workflow: batch.workflow,
            published_at,
            artifacts,
        };

        let manifest_key = self.storage.key(&self.storage.manifest);
        self.store
            .put(&manifest_key, to_json_bytes(&manifest)?)
            .await?;
        log::info!(
            "Committed {} ({} artifacts)",
            self.store.location(&manifest_key),
            manifest.artifacts.len()
        );

        Ok(manifest)
    }
}

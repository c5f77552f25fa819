//! Artifact store abstraction.
//!
//! Published datasets, the status marker and the manifest all live in one
//! flat key space:
//!
//! ```text
//! {prefix}/
//! ├── status.json              # single-flight marker
//! ├── departments.json         # department registry
//! ├── departmentsNoPrefix.json # departments still lacking a prefix
//! ├── data.json                # courses and sections
//! ├── musts.json               # must courses per prefix and semester
//! ├── lastUpdated.json         # semester + publish time
//! ├── manualPrefixes.json      # operator overrides
//! └── manifest.json            # version pointer of the last publish
//! ```

pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;

// Re-export for convenience
pub use local::LocalStorage;
#[cfg(feature = "s3")]
pub use s3::S3Storage;

/// Durable key/value store for published artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Read an artifact, `None` if it does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Create or replace an artifact.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// Check whether an artifact exists.
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Replace `key` with `new` only if its current content equals `expected`
    /// (`None` meaning absent). Returns whether the swap happened.
    ///
    /// The default is a plain check-then-write and therefore only advisory;
    /// backends with conditional writes override it.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        new: Vec<u8>,
    ) -> Result<bool> {
        let current = self.get(key).await?;
        if current.as_deref() != expected {
            return Ok(false);
        }
        self.put(key, new).await?;
        Ok(true)
    }

    /// Human-readable location of a key, for logs.
    fn location(&self, key: &str) -> String {
        key.to_string()
    }
}

/// Read and deserialize a JSON artifact.
pub async fn read_json<T: DeserializeOwned>(
    store: &dyn ArtifactStore,
    key: &str,
) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Serialize a value the way every artifact is published: pretty UTF-8 JSON.
pub fn to_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(value)?)
}

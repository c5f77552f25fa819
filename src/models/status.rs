//! Run status marker, run outcomes and the publish manifest.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted single-flight marker (`status.json`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    pub status: StatusKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Idle,
    Busy,
}

impl RunStatus {
    pub const IDLE: Self = Self {
        status: StatusKind::Idle,
    };
    pub const BUSY: Self = Self {
        status: StatusKind::Busy,
    };

    pub fn is_busy(&self) -> bool {
        self.status == StatusKind::Busy
    }
}

/// Which workflow a run executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Workflow {
    Scrape,
    Musts,
}

impl Workflow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scrape => "scrape",
            Self::Musts => "musts",
        }
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of invoking a workflow entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// Another run holds the status marker
    Busy,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "success",
            Self::Busy => "busy",
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One uploaded artifact in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub key: String,
    pub sha256: String,
    pub bytes: usize,
}

/// Version pointer committed after every artifact of a run is uploaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub run_id: String,
    pub workflow: Workflow,
    pub published_at: DateTime<Utc>,
    pub artifacts: Vec<ManifestEntry>,
}

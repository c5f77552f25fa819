// src/models/mod.rs

//! Domain models for the catalog crawler.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod catalog;
mod config;
mod status;

// Re-export all public types
pub use catalog::{
    Course, CourseData, CourseListing, CurrentSemester, Department, DepartmentRecord,
    DepartmentRegistry, LastUpdated, MeetingTime, MustData, MustNode, Prefix, Section, Sections,
};
pub use config::{CatalogConfig, Config, CrawlerConfig, StorageConfig};
pub use status::{Manifest, ManifestEntry, RunOutcome, RunStatus, StatusKind, Workflow};

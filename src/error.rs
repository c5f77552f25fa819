// src/error.rs

//! Unified error handling for the catalog crawler.
//!
//! [`AppError::Crawl`] is the only *recoverable* kind: the run guard resets the
//! status marker to idle before re-raising it. Every other variant is treated
//! as an abnormal process state and propagates without touching the marker.

use std::fmt;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Artifact store error
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built or used outside the fetch layer
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),


    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Recoverable crawl failure
    #[error("{message}{context}")]
    Crawl {
        message: String,
        context: CrawlContext,
    },
}

impl AppError {
    /// Create a recoverable crawl error with context.
    pub fn crawl(message: impl Into<String>, context: CrawlContext) -> Self {
        Self::Crawl {
            message: message.into(),
            context,
        }
    }

    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a storage error.
    pub fn storage(message: impl fmt::Display) -> Self {
        Self::Storage(message.to_string())
    }

    /// Whether the run guard should reset the status marker for this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Crawl { .. })
    }

    /// Context of a recoverable error.
    pub fn context(&self) -> Option<&CrawlContext> {
        match self {
            Self::Crawl { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Wrap any error as a recoverable crawl error, keeping existing context.
    ///
    /// Fields already present on an inner crawl error win over `context`.
    pub fn into_crawl(self, message: impl Into<String>, context: CrawlContext) -> Self {
        let merged = match &self {
            Self::Crawl { context: inner, .. } => inner.clone().or(context),
            _ => context,
        };
        Self::crawl(message, merged.cause(self))
    }
}

/// Structured context attached to a recoverable crawl error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlContext {
    pub dept_code: Option<String>,
    pub course_code: Option<String>,
    pub stage: Option<&'static str>,
    pub attempts: Option<u32>,
    pub cause: Option<String>,
}

impl CrawlContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dept(mut self, code: impl Into<String>) -> Self {
        self.dept_code = Some(code.into());
        self
    }

    pub fn course(mut self, code: impl Into<String>) -> Self {
        self.course_code = Some(code.into());
        self
    }

    pub fn stage(mut self, stage: &'static str) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts);
        self
    }

    pub fn cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    /// Fill unset fields from `other`.
    fn or(self, other: CrawlContext) -> Self {
        Self {
            dept_code: self.dept_code.or(other.dept_code),
            course_code: self.course_code.or(other.course_code),
            stage: self.stage.or(other.stage),
            attempts: self.attempts.or(other.attempts),
            cause: self.cause.or(other.cause),
        }
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for CrawlContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }

        let mut parts = Vec::new();
        if let Some(stage) = self.stage {
            parts.push(format!("stage={stage}"));
        }
        if let Some(dept) = &self.dept_code {
            parts.push(format!("dept_code={dept}"));
        }
        if let Some(course) = &self.course_code {
            parts.push(format!("course_code={course}"));
        }
        if let Some(attempts) = self.attempts {
            parts.push(format!("attempts={attempts}"));
        }
        if let Some(cause) = &self.cause {
            parts.push(format!("error={cause}"));
        }
        write!(f, " ({})", parts.join(", "))
    }
}

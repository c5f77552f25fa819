// src/lambda/mod.rs

//! AWS Lambda handler for the crawler.
//!
//! Each invocation names one workflow:
//!
//! ```json
//! {"task": "scrape"}
//! ```
//!
//! and answers with `{"status": "success" | "busy" | "error"}`. Artifacts live
//! in S3 (`S3_BUCKET`, `S3_PREFIX`); crawler settings come from the
//! environment (see [`Config::apply_env`]).

use lambda_runtime::{Error as LambdaError, LambdaEvent};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::Result;
use crate::models::{Config, RunOutcome, Workflow};
use crate::pipeline::{RunContext, run_musts, run_scrape};
use crate::storage::S3Storage;
use crate::utils::http::HttpFetcher;

/// Lambda invocation payload.
#[derive(Debug, Deserialize)]
pub struct TaskRequest {
    pub task: Workflow,
}

/// Lambda response payload.
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub status: &'static str,

    /// Error message if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<RunOutcome> for TaskResponse {
    fn from(outcome: RunOutcome) -> Self {
        Self {
            status: outcome.as_str(),
            message: None,
        }
    }
}

/// Main Lambda handler function.
#[instrument(skip(event))]
pub async fn handler(
    event: LambdaEvent<TaskRequest>,
) -> std::result::Result<TaskResponse, LambdaError> {
    let (request, _context) = event.into_parts();
    info!("Starting task: {}", request.task);

    match run_task(request.task).await {
        Ok(outcome) => {
            info!("Task {} finished: {}", request.task, outcome);
            Ok(outcome.into())
        }
        Err(e) => {
            error!("Task {} failed: {}", request.task, e);
            Ok(TaskResponse {
                status: "error",
                message: Some(e.to_string()),
            })
        }
    }
}

async fn run_task(task: Workflow) -> Result<RunOutcome> {
    let mut config = Config::default();
    config.apply_env();
    config.validate()?;

    let store = S3Storage::from_env().await?;
    let fetcher = HttpFetcher::new(&config.crawler)?;
    let ctx = RunContext::new(&config, &store, &fetcher);

    match task {
        Workflow::Scrape => run_scrape(&ctx).await,
        Workflow::Musts => run_musts(&ctx).await,
    }
}

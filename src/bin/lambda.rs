//! AWS Lambda entry point for the catalog crawler.
//!
//! Deploy with `cargo lambda build --release --features lambda`.
//!
//! ## Environment Variables
//!
//! - `S3_BUCKET`: Artifact bucket (default: `catalog-artifacts`)
//! - `S3_PREFIX`: Key prefix inside the bucket
//! - `CATALOG_BASE_URL`: Catalog host to crawl
//! - `CRAWL_TIMEOUT_SECS`: HTTP request timeout
//! - `REQUEST_DELAY_MS`: Minimum spacing between requests
//! - `MAX_ATTEMPTS`: Attempts per page
//! - `RUST_LOG`: Log level (e.g., `info`, `debug`)

use catalog_crawler::lambda;
use lambda_runtime::{Error as LambdaError, service_fn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    // Library code logs through `log`; `init` also bridges those records.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!("Catalog crawler Lambda starting...");
    lambda_runtime::run(service_fn(lambda::handler)).await
}

//! Catalog crawler CLI
//!
//! Local execution entry point. For AWS Lambda, use `catalog-crawler-lambda`.

use std::path::PathBuf;

use catalog_crawler::{
    error::Result,
    models::{Config, RunOutcome},
    pipeline::{self, RunContext, RunGuard},
    storage::{ArtifactStore, LocalStorage},
    utils::http::HttpFetcher,
};

use clap::{Parser, Subcommand};

/// Course catalog crawler
#[derive(Parser, Debug)]
#[command(
    name = "catalog-crawler",
    version,
    about = "Crawls the course catalog and publishes JSON datasets"
)]
struct Cli {
    /// Directory holding config.toml and, for local runs, the artifacts
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Config file (default: {storage_dir}/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Publish to S3 (S3_BUCKET) instead of the storage directory
    #[cfg(feature = "s3")]
    #[arg(long)]
    s3: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl departments, courses and sections
    Scrape,

    /// Crawl must courses of every department with a known prefix
    Musts,

    /// Show the run status marker
    Status,

    /// Force the run status marker back to idle
    Reset,

    /// Validate configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[cfg(feature = "s3")]
async fn open_store(cli: &Cli) -> Result<Box<dyn ArtifactStore>> {
    if cli.s3 {
        let store = catalog_crawler::storage::S3Storage::from_env().await?;
        return Ok(Box::new(store));
    }
    Ok(Box::new(LocalStorage::new(&cli.storage_dir)))
}

#[cfg(not(feature = "s3"))]
async fn open_store(cli: &Cli) -> Result<Box<dyn ArtifactStore>> {
    Ok(Box::new(LocalStorage::new(&cli.storage_dir)))
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.storage_dir.join("config.toml"));
    let config = Config::load_or_default(&config_path);
    log::debug!("Configuration: {:?}", config);

    let store = open_store(&cli).await?;

    match cli.command {
        Command::Scrape | Command::Musts => {
            config.validate()?;
            let fetcher = HttpFetcher::new(&config.crawler)?;
            let ctx = RunContext::new(&config, store.as_ref(), &fetcher);

            let outcome = match cli.command {
                Command::Scrape => pipeline::run_scrape(&ctx).await?,
                _ => pipeline::run_musts(&ctx).await?,
            };
            match outcome {
                RunOutcome::Completed => log::info!("Done!"),
                RunOutcome::Busy => log::warn!(
                    "Another run is in progress. Use 'reset' if it crashed."
                ),
            }
        }

        Command::Status => {
            let guard = RunGuard::new(store.as_ref(), &config.storage);
            let status = guard.status().await?;
            log::info!(
                "{}: {}",
                store.location(&config.storage.key(&config.storage.status)),
                if status.is_busy() { "busy" } else { "idle" }
            );
        }

        Command::Reset => {
            RunGuard::new(store.as_ref(), &config.storage)
                .release()
                .await?;
            log::info!("Status reset to idle");
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK ({})", config_path.display());
        }
    }

    Ok(())
}

//! # Archive Miner
//!
//! Recovers the text of recently published Harvard Business Review articles
//! from archive.is snapshots and hands each one downstream.
//!
//! ## Features
//!
//! - Paginates HBR's "The Latest" listing in a headless Chromium to collect
//!   article URLs
//! - Locates an archived snapshot per article through configurable
//!   strategies (search form, loader endpoint, run-and-revisit)
//! - Extracts the title and body text and filters out page chrome
//! - Optionally cleans bodies through Groq and posts rows to WordPress
//! - Writes every row of a run to a dated JSON file
//!
//! ## Usage
//!
//! ```sh
//! archive_miner -o ./output --strategy search-form --strategy direct-loader
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Indexing**: Collect article links from the index page
//! 2. **Locating**: Drive the archive to a snapshot of each link (retried)
//! 3. **Extracting**: Pull title and body out of the snapshot DOM
//! 4. **Output**: Clean, publish and store the resulting rows

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod archive;
mod browser;
mod cli;
mod collaborators;
mod config;
mod error;
mod extract;
mod models;
mod pipeline;
mod poll;
mod retry;
mod scrapers;
mod utils;

use archive::{ArchiveMiner, SnapshotLocator};
use browser::chrome::ChromeSession;
use cli::Cli;
use collaborators::{GroqCleaner, JsonFileSink, WordPressPublisher};
use config::PipelineConfig;
use extract::ContentExtractor;
use pipeline::PipelineRunner;
use retry::RetryPolicy;
use scrapers::index::LinkCollector;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("archive_miner starting up");

    let args = Cli::parse();
    debug!(?args.config, %args.output_dir, ?args.strategies, "Parsed CLI arguments");

    // ---- Configuration ----
    let mut config = PipelineConfig::load(args.config.as_deref())?;
    if !args.strategies.is_empty() {
        config.archive.strategies = args.strategies.clone();
    }
    if args.headful {
        config.browser.headless = false;
    }
    info!(strategies = ?config.archive.strategies, headless = config.browser.headless, "Effective configuration");

    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Components ----
    let collector = LinkCollector::new(config.index.clone())?;
    let locator = SnapshotLocator::new(config.archive.clone())?;
    let extractor = ContentExtractor::new(&config.extraction)?;
    let miner = ArchiveMiner::new(locator, extractor);
    let retry = RetryPolicy::from_config(&config.retry);

    let cleaner = args
        .groq_api_key
        .as_deref()
        .map(|key| GroqCleaner::new(key, &args.groq_endpoint, &args.groq_model))
        .transpose()?;
    let publisher = args
        .wp_url
        .as_deref()
        .map(WordPressPublisher::new)
        .transpose()?;
    info!(
        cleanup = cleaner.is_some(),
        publish = publisher.is_some(),
        "Collaborators configured"
    );
    let sink = JsonFileSink::new(&args.output_dir);

    let runner = PipelineRunner::new(
        collector,
        miner,
        retry,
        config.throttle.link_delay(),
        cleaner,
        publisher,
        sink,
    )
    .with_max_links(args.max_links);

    // ---- Run ----
    let session = match ChromeSession::launch(&config.browser).await {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, "Failed to launch browser");
            return Err(e.into());
        }
    };

    let summary = runner.run(&session).await;
    session.shutdown().await;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        rows = summary.rows.len(),
        failed = summary.failed,
        "Execution complete"
    );

    Ok(())
}

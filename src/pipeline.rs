//! End-to-end run: collect links, mine each one, hand rows downstream.
//!
//! Links are processed strictly one at a time with a fixed pause between
//! them; the archive provider is rate sensitive. A link either yields one
//! [`PipelineRow`] or is skipped, and no per-link failure stops the run.

use crate::archive::ArchiveMiner;
use crate::browser::{BrowserSession, NavigableContext};
use crate::collaborators::{Publisher, ResultSink, TextCleaner, clean_or_raw};
use crate::models::{ArticleLink, PipelineRow, SnapshotResult, SnapshotStatus};
use crate::retry::RetryPolicy;
use crate::scrapers::index::LinkCollector;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Counts and rows produced by one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Links processed, after any `max_links` cap.
    pub links: usize,
    /// Snapshots found with usable content; one row each.
    pub found: usize,
    /// Links the provider holds no snapshot for.
    pub not_found: usize,
    /// Links whose every retry attempt faulted.
    pub failed: usize,
    /// Found, but title or body came out empty.
    pub empty: usize,
    /// Rows in link order, as handed to the result sink.
    pub rows: Vec<PipelineRow>,
}

/// Drives one complete run over a browser session.
///
/// Generic over its collaborators so each can be a real client, `None`
/// (via the `Option` impls) or a test double.
///
/// # Type Parameters
///
/// * `C` - Body cleanup ([`TextCleaner`])
/// * `P` - Per-row publishing ([`Publisher`])
/// * `K` - End-of-run storage ([`ResultSink`])
pub struct PipelineRunner<C, P, K> {
    collector: LinkCollector,
    miner: ArchiveMiner,
    retry: RetryPolicy,
    link_delay: Duration,
    max_links: Option<usize>,
    cleaner: C,
    publisher: P,
    sink: K,
}

impl<C, P, K> PipelineRunner<C, P, K>
where
    C: TextCleaner,
    P: Publisher,
    K: ResultSink,
{
    /// Assemble a runner from its parts.
    ///
    /// # Arguments
    ///
    /// * `collector` - Harvests links from the index page
    /// * `miner` - Locates and extracts one snapshot per attempt
    /// * `retry` - Bounds how often a faulting link is attempted
    /// * `link_delay` - Pause after every link
    /// * `cleaner`, `publisher`, `sink` - Downstream collaborators
    pub fn new(
        collector: LinkCollector,
        miner: ArchiveMiner,
        retry: RetryPolicy,
        link_delay: Duration,
        cleaner: C,
        publisher: P,
        sink: K,
    ) -> Self {
        Self {
            collector,
            miner,
            retry,
            link_delay,
            max_links: None,
            cleaner,
            publisher,
            sink,
        }
    }

    /// Process at most `max_links` of the collected links.
    pub fn with_max_links(mut self, max_links: Option<usize>) -> Self {
        self.max_links = max_links;
        self
    }

    /// Collect links, mine each in order and hand the rows downstream.
    ///
    /// # Arguments
    ///
    /// * `session` - Browser used for the index page and every attempt
    ///
    /// # Returns
    ///
    /// A [`RunSummary`] with per-outcome counts and the gathered rows. Per-link
    /// faults and collaborator failures are logged and counted, never returned.
    #[instrument(level = "info", skip_all)]
    pub async fn run<S: BrowserSession>(&self, session: &S) -> RunSummary {
        let mut links = self.collect_links(session).await;
        if let Some(max) = self.max_links {
            links.truncate(max);
        }

        let mut summary = RunSummary {
            links: links.len(),
            ..RunSummary::default()
        };
        info!(count = links.len(), max_attempts = self.retry.max_attempts(), "Mining article links");

        for (i, link) in links.iter().enumerate() {
            let result = self.acquire(session, link).await;
            match result.status {
                SnapshotStatus::Found if result.has_content() => {
                    summary.found += 1;
                    let row = self.finish(result).await;
                    summary.rows.push(row);
                }
                SnapshotStatus::Found => {
                    summary.empty += 1;
                    warn!(index = i, url = %link, snapshot = %result.snapshot_url, "Snapshot had no usable content; skipping");
                }
                SnapshotStatus::NotFound => {
                    summary.not_found += 1;
                    info!(index = i, url = %link, "No snapshot available; skipping");
                }
                SnapshotStatus::Failed => {
                    summary.failed += 1;
                    warn!(index = i, url = %link, "Snapshot acquisition failed; skipping");
                }
            }
            sleep(self.link_delay).await;
        }

        if summary.rows.is_empty() {
            warn!("No rows gathered; result sink skipped");
        } else if let Err(e) = self.sink.store(&summary.rows).await {
            error!(error = %e, rows = summary.rows.len(), "Failed to store result rows");
        }

        info!(
            links = summary.links,
            found = summary.found,
            not_found = summary.not_found,
            failed = summary.failed,
            empty = summary.empty,
            "Run complete"
        );
        summary
    }

    /// Collect on a dedicated page that is closed before mining starts.
    async fn collect_links<S: BrowserSession>(&self, session: &S) -> Vec<ArticleLink> {
        let page = match session.open_context().await {
            Ok(page) => page,
            Err(e) => {
                error!(error = %e, "Could not open index page");
                return Vec::new();
            }
        };
        let links = self.collector.collect(&page).await;
        if let Err(e) = page.close().await {
            warn!(error = %e, "Failed to close index page");
        }
        links
    }

    async fn acquire<S: BrowserSession>(&self, session: &S, link: &ArticleLink) -> SnapshotResult {
        let miner = &self.miner;
        match self
            .retry
            .run(link.as_str(), move || miner.mine(session, link))
            .await
        {
            Ok(result) => result,
            Err(exhausted) => {
                error!(url = %link, attempts = exhausted.attempts, error = %exhausted.last, "Giving up on link");
                SnapshotResult::failed()
            }
        }
    }

    /// Clean, publish and turn a found snapshot into a row.
    async fn finish(&self, result: SnapshotResult) -> PipelineRow {
        let body = clean_or_raw(&self.cleaner, &result.title, &result.body).await;
        let row = PipelineRow {
            title: result.title,
            body,
        };
        if let Err(e) = self.publisher.publish(&row).await {
            warn!(title = %row.title, error = %e, "Publishing failed");
        }
        row
    }
}

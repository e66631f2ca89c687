//! Snapshot acquisition from the archive provider.
//!
//! The provider redesigns its pages often, so reaching a snapshot is split
//! into interchangeable [`Strategy`] variants, each implementing the same
//! contract: leave the page showing the snapshot and report which
//! [`ExtractionContext`] holds the article, or report [`Located::NotFound`].
//!
//! | Strategy | Module | Approach |
//! |----------|--------|----------|
//! | `search-form` | [`search_form`] | Landing page search, results page or frame, follow first snapshot link |
//! | `direct-loader` | [`direct_loader`] | Loader endpoint, poll for a snapshot frame or a heading |
//! | `direct-navigate-revisit` | [`revisit`] | Search+run URL, settle, follow link, navigate again |
//!
//! [`ArchiveMiner`] owns the page lifecycle: exactly one page per attempt,
//! closed on every exit path.

pub mod direct_loader;
pub mod revisit;
pub mod search_form;

use crate::browser::{
    BrowserSession, ExtractionContext, NavigableContext, first_attribute, named_frame,
    wait_for_selector,
};
use crate::config::ArchiveConfig;
use crate::error::{BrowserError, ConfigError};
use crate::extract::ContentExtractor;
use crate::models::{ArticleLink, SnapshotResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, instrument, warn};

/// One way of driving the provider to a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    SearchForm,
    DirectLoader,
    DirectNavigateRevisit,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::SearchForm => "search-form",
            Strategy::DirectLoader => "direct-loader",
            Strategy::DirectNavigateRevisit => "direct-navigate-revisit",
        })
    }
}

impl Strategy {
    /// Run this strategy alone on `page`.
    ///
    /// # Errors
    ///
    /// Whatever transient fault the strategy hit; see each module.
    pub async fn locate<C: NavigableContext>(
        self,
        locator: &SnapshotLocator,
        page: &C,
        original_url: &str,
    ) -> Result<Located, BrowserError> {
        match self {
            Strategy::SearchForm => search_form::locate(locator, page, original_url).await,
            Strategy::DirectLoader => direct_loader::locate(locator, page, original_url).await,
            Strategy::DirectNavigateRevisit => revisit::locate(locator, page, original_url).await,
        }
    }
}

/// Where a strategy left the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    Found(ExtractionContext),
    NotFound,
}

/// Runs the configured strategies in order until one finds a snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotLocator {
    config: ArchiveConfig,
    snapshot_url: Regex,
}

impl SnapshotLocator {
    /// Validate `config` and compile its snapshot URL pattern.
    ///
    /// # Arguments
    ///
    /// * `config` - Provider endpoints, selectors, waits and the strategy order
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when no strategy is configured or
    /// `snapshot_url_pattern` does not compile.
    pub fn new(config: ArchiveConfig) -> Result<Self, ConfigError> {
        if config.strategies.is_empty() {
            return Err(ConfigError::Invalid {
                field: "archive.strategies",
                reason: "at least one strategy is required".to_string(),
            });
        }
        let snapshot_url =
            Regex::new(&config.snapshot_url_pattern).map_err(|e| ConfigError::Invalid {
                field: "archive.snapshot_url_pattern",
                reason: e.to_string(),
            })?;
        let budget = config.attempt_budget();
        let needed = config.derived_budget();
        if budget < needed {
            warn!(
                ?budget,
                ?needed,
                "Attempt budget is shorter than the configured waits; slow misses will be retried as timeouts"
            );
        }
        Ok(Self {
            config,
            snapshot_url,
        })
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    pub fn is_snapshot_url(&self, url: &str) -> bool {
        self.snapshot_url.is_match(url)
    }

    /// Try every strategy within the composite attempt budget.
    ///
    /// `NotFound` from one strategy falls through to the next; an error ends
    /// the attempt so the caller can retry it.
    #[instrument(level = "info", skip_all, fields(url = %original_url))]
    pub async fn locate<C: NavigableContext>(
        &self,
        page: &C,
        original_url: &str,
    ) -> Result<Located, BrowserError> {
        let budget = self.config.attempt_budget();
        let all = async {
            for strategy in &self.config.strategies {
                debug!(%strategy, "Trying strategy");
                match strategy.locate(self, page, original_url).await? {
                    Located::Found(ctx) => {
                        info!(%strategy, ?ctx, "Snapshot located");
                        return Ok(Located::Found(ctx));
                    }
                    Located::NotFound => info!(%strategy, "No snapshot via strategy"),
                }
            }
            Ok::<_, BrowserError>(Located::NotFound)
        };
        tokio::time::timeout(budget, all)
            .await
            .map_err(|_| BrowserError::Timeout {
                waited: budget,
                what: format!("snapshot of {original_url}"),
            })?
    }

    /// Context holding search results: the named results frame if the page
    /// embeds one, otherwise the top-level document.
    pub(crate) async fn results_root<C: NavigableContext>(
        &self,
        page: &C,
    ) -> Result<ExtractionContext, BrowserError> {
        Ok(match named_frame(page, &self.config.results_frame_name).await? {
            Some(frame) => {
                debug!(frame = %frame.url, "Results rendered inside frame");
                ExtractionContext::Frame(frame)
            }
            None => ExtractionContext::TopLevel,
        })
    }

    /// Wait for the first snapshot link in the results and return its href.
    pub(crate) async fn snapshot_href<C: NavigableContext>(
        &self,
        page: &C,
        results: &ExtractionContext,
    ) -> Result<Option<String>, BrowserError> {
        let selector = &self.config.snapshot_link_selector;
        let appeared = wait_for_selector(
            page,
            results,
            selector,
            self.config.snapshot_link_wait(),
            self.config.poll_interval(),
        )
        .await?;
        if !appeared {
            return Ok(None);
        }
        Ok(first_attribute(page, results, selector, "href")
            .await?
            .filter(|href| !href.trim().is_empty()))
    }
}

/// Locate then extract, owning one page for the whole attempt.
#[derive(Debug, Clone)]
pub struct ArchiveMiner {
    locator: SnapshotLocator,
    extractor: ContentExtractor,
}

impl ArchiveMiner {
    pub fn new(locator: SnapshotLocator, extractor: ContentExtractor) -> Self {
        Self { locator, extractor }
    }

    /// One acquisition attempt for `link`.
    ///
    /// `Ok` carries a `Found` or `NotFound` result; `Err` is a transient fault
    /// to be retried. The page is closed before returning either way.
    #[instrument(level = "info", skip_all, fields(url = %link))]
    pub async fn mine<S: BrowserSession>(
        &self,
        session: &S,
        link: &ArticleLink,
    ) -> Result<SnapshotResult, BrowserError> {
        let page = session.open_context().await?;
        let outcome = self.mine_in(&page, link).await;
        if let Err(e) = page.close().await {
            warn!(error = %e, "Failed to close archive page");
        }
        outcome
    }

    async fn mine_in<C: NavigableContext>(
        &self,
        page: &C,
        link: &ArticleLink,
    ) -> Result<SnapshotResult, BrowserError> {
        match self.locator.locate(page, link.as_str()).await? {
            Located::NotFound => Ok(SnapshotResult::not_found()),
            Located::Found(ctx) => {
                let article = self.extractor.extract_from(page, &ctx).await?;
                let snapshot_url = match &ctx {
                    ExtractionContext::Frame(frame) => frame.url.clone(),
                    ExtractionContext::TopLevel => page.current_url().await?,
                };
                Ok(SnapshotResult::found(article, snapshot_url))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::browser::fake::FakeWeb;
    use crate::config::ExtractionConfig;
    use crate::models::SnapshotStatus;
    use std::time::Duration;
    use url::Url;

    pub(crate) const ORIGINAL: &str = "https://hbr.org/2025/05/the-quiet-leader";
    pub(crate) const LANDING: &str = "https://archive.is/";
    pub(crate) const RESULTS: &str = "https://archive.is/search/?q=the-quiet-leader";
    pub(crate) const SNAPSHOT: &str = "https://archive.is/Xy12Z";

    pub(crate) const LANDING_HTML: &str =
        r#"<html><body><form id="search"><input name="q"></form></body></html>"#;
    pub(crate) const RESULTS_HTML: &str = r#"<html><body><div class="TEXT-BLOCK">
        <a href="https://archive.is/Xy12Z">hbr.org</a></div></body></html>"#;
    pub(crate) const EMPTY_RESULTS_HTML: &str =
        r#"<html><body><div class="TEXT-BLOCK">No results</div></body></html>"#;
    pub(crate) const SNAPSHOT_HTML: &str = r#"<html><head><title>The Quiet Leader | HBR</title></head>
        <body><div id="CONTENT"><p>Leadership</p><h1>The Quiet Leader</h1>
        <p>Quiet leaders build teams that keep going long after they leave the room.</p>
        <p>Subscribe</p><p>They listen first.</p></div></body></html>"#;

    pub(crate) fn locator_with(strategies: Vec<Strategy>) -> SnapshotLocator {
        let config = ArchiveConfig {
            strategies,
            ..ArchiveConfig::default()
        };
        SnapshotLocator::new(config).unwrap()
    }

    pub(crate) fn miner_with(strategies: Vec<Strategy>) -> ArchiveMiner {
        ArchiveMiner::new(
            locator_with(strategies),
            ContentExtractor::new(&ExtractionConfig::default()).unwrap(),
        )
    }

    pub(crate) fn link(url: &str) -> ArticleLink {
        ArticleLink::new(Url::parse(url).unwrap())
    }

    #[test]
    fn snapshot_pattern_matches_provider_urls() {
        let locator = locator_with(vec![Strategy::SearchForm]);
        assert!(locator.is_snapshot_url("https://archive.is/Xy12Z"));
        assert!(locator.is_snapshot_url("https://archive.ph/2025.05.01-120000/abc"));
        assert!(!locator.is_snapshot_url("https://archive.is/"));
        assert!(!locator.is_snapshot_url("https://hbr.org/2025/05/x"));
    }

    #[test]
    fn empty_strategy_list_is_rejected() {
        let config = ArchiveConfig {
            strategies: vec![],
            ..ArchiveConfig::default()
        };
        assert!(matches!(
            SnapshotLocator::new(config),
            Err(ConfigError::Invalid { field: "archive.strategies", .. })
        ));
    }

    #[test]
    fn strategy_display_matches_config_names() {
        assert_eq!(Strategy::DirectNavigateRevisit.to_string(), "direct-navigate-revisit");
        let parsed: Vec<Strategy> = serde_yaml::from_str("[search-form, direct-loader]").unwrap();
        assert_eq!(parsed, vec![Strategy::SearchForm, Strategy::DirectLoader]);
    }

    #[tokio::test(start_paused = true)]
    async fn mine_extracts_found_snapshot_and_closes_page() {
        let session = FakeWeb::new()
            .page(LANDING, LANDING_HTML)
            .search(ORIGINAL, RESULTS)
            .page(RESULTS, RESULTS_HTML)
            .page(SNAPSHOT, SNAPSHOT_HTML)
            .into_session();

        let result = miner_with(vec![Strategy::SearchForm])
            .mine(&session, &link(ORIGINAL))
            .await
            .unwrap();

        assert_eq!(result.status, SnapshotStatus::Found);
        assert_eq!(result.title, "The Quiet Leader");
        assert_eq!(
            result.body,
            "Quiet leaders build teams that keep going long after they leave the room.\n\nThey listen first."
        );
        assert_eq!(result.snapshot_url, SNAPSHOT);
        let stats = session.stats();
        assert_eq!(stats.open, 0);
        assert_eq!(stats.closed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn mine_reports_not_found_without_error() {
        let session = FakeWeb::new()
            .page(LANDING, LANDING_HTML)
            .search(ORIGINAL, RESULTS)
            .page(RESULTS, EMPTY_RESULTS_HTML)
            .into_session();

        let result = miner_with(vec![Strategy::SearchForm])
            .mine(&session, &link(ORIGINAL))
            .await
            .unwrap();

        assert_eq!(result, SnapshotResult::not_found());
        assert_eq!(session.stats().open, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn mine_closes_page_on_fault() {
        let session = FakeWeb::new().failing(LANDING).into_session();

        let err = miner_with(vec![Strategy::SearchForm])
            .mine(&session, &link(ORIGINAL))
            .await
            .unwrap_err();

        assert!(matches!(err, BrowserError::Navigation { .. }));
        let stats = session.stats();
        assert_eq!(stats.open, 0);
        assert_eq!(stats.closed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_budget_expiry_is_a_timeout_and_closes_page() {
        let config = ArchiveConfig {
            strategies: vec![Strategy::SearchForm],
            attempt_budget_ms: Some(5_000),
            ..ArchiveConfig::default()
        };
        let miner = ArchiveMiner::new(
            SnapshotLocator::new(config).unwrap(),
            ContentExtractor::new(&ExtractionConfig::default()).unwrap(),
        );
        // no search box, so the input wait alone would run 45 s
        let session = FakeWeb::new()
            .page(LANDING, "<html><body><p>Loading…</p></body></html>")
            .into_session();
        let start = tokio::time::Instant::now();

        let err = miner.mine(&session, &link(ORIGINAL)).await.unwrap_err();

        match err {
            BrowserError::Timeout { waited, .. } => assert_eq!(waited, Duration::from_secs(5)),
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(start.elapsed(), Duration::from_secs(5));
        let stats = session.stats();
        assert_eq!(stats.open, 0);
        assert_eq!(stats.closed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_falls_through_to_next_strategy() {
        let loader = format!("https://archive.is/newest/{ORIGINAL}");
        let session = FakeWeb::new()
            .page(LANDING, LANDING_HTML)
            .search(ORIGINAL, RESULTS)
            .page(RESULTS, EMPTY_RESULTS_HTML)
            .page(&loader, SNAPSHOT_HTML)
            .into_session();

        let result = miner_with(vec![Strategy::SearchForm, Strategy::DirectLoader])
            .mine(&session, &link(ORIGINAL))
            .await
            .unwrap();

        assert_eq!(result.status, SnapshotStatus::Found);
        assert_eq!(result.title, "The Quiet Leader");
        assert_eq!(result.snapshot_url, loader);
    }
}

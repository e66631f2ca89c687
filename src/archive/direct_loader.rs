//! Direct-loader strategy: hand the original URL straight to the provider.
//!
//! The loader endpoint either forwards to the newest existing snapshot or
//! starts a live capture. The page is polled until a frame pointing at a
//! snapshot shows up or a primary heading renders in the top-level document.

use super::{Located, SnapshotLocator};
use crate::browser::{ExtractionContext, NavigableContext, goto_bounded};
use crate::error::BrowserError;
use crate::poll::{PollOutcome, poll_until};
use tracing::{debug, info, instrument};

/// Load the snapshot of `original_url` through the loader endpoint.
///
/// The loader usually redirects while it is being polled, which tears down the
/// JavaScript context mid-query. Such [`BrowserError::Script`] and
/// [`BrowserError::Detached`] faults count as "not yet"; only the wait budget
/// decides between `Found` and `NotFound`.
///
/// # Returns
///
/// * `Located::Found(Frame)` if a frame pointing at a snapshot appeared
/// * `Located::Found(TopLevel)` if a heading rendered in the page itself
/// * `Located::NotFound` if `loader_wait` expired with neither
///
/// # Errors
///
/// Navigation to the loader failing or timing out.
#[instrument(level = "debug", skip_all, fields(url = %original_url))]
pub async fn locate<C: NavigableContext>(
    locator: &SnapshotLocator,
    page: &C,
    original_url: &str,
) -> Result<Located, BrowserError> {
    let config = locator.config();
    let loader = format!("{}{}", config.loader_url, original_url);
    goto_bounded(page, &loader, config.navigation_timeout()).await?;

    let outcome = poll_until(config.loader_wait(), config.poll_interval(), move || async move {
        match snapshot_ready(locator, page).await {
            Err(BrowserError::Script(reason) | BrowserError::Detached(reason)) => {
                debug!(%reason, "Page changed mid-query; polling again");
                Ok(None)
            }
            other => other,
        }
    })
    .await?;

    match outcome {
        PollOutcome::Ready(ctx) => Ok(Located::Found(ctx)),
        PollOutcome::TimedOut => {
            info!(waited = ?config.loader_wait(), "Loader produced no snapshot");
            Ok(Located::NotFound)
        }
    }
}

/// A snapshot frame wins over a top-level heading when both are present.
async fn snapshot_ready<C: NavigableContext>(
    locator: &SnapshotLocator,
    page: &C,
) -> Result<Option<ExtractionContext>, BrowserError> {
    if let Some(frame) = page
        .frames()
        .await?
        .into_iter()
        .find(|frame| locator.is_snapshot_url(&frame.url))
    {
        debug!(frame = %frame.url, "Snapshot frame appeared");
        return Ok(Some(ExtractionContext::Frame(frame)));
    }
    let heading = &locator.config().heading_selector;
    if page.exists(&ExtractionContext::TopLevel, heading).await? {
        debug!("Heading rendered in top-level document");
        return Ok(Some(ExtractionContext::TopLevel));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::Strategy;
    use crate::archive::tests::*;
    use crate::browser::fake::FakeWeb;
    use crate::browser::{BrowserSession, FrameRef};
    use std::time::Duration;

    fn loader_url() -> String {
        format!("https://archive.is/newest/{ORIGINAL}")
    }

    #[tokio::test(start_paused = true)]
    async fn heading_in_top_level_is_found() {
        let session = FakeWeb::new().page(&loader_url(), SNAPSHOT_HTML).into_session();
        let page = session.open_context().await.unwrap();

        let located = locate(&locator_with(vec![Strategy::DirectLoader]), &page, ORIGINAL)
            .await
            .unwrap();

        assert_eq!(located, Located::Found(ExtractionContext::TopLevel));
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_frame_is_found() {
        let session = FakeWeb::new()
            .page(&loader_url(), "<html><body><h1>Archive shell</h1><iframe></iframe></body></html>")
            .frame(&loader_url(), None, SNAPSHOT)
            .page(SNAPSHOT, SNAPSHOT_HTML)
            .into_session();
        let page = session.open_context().await.unwrap();

        let located = locate(&locator_with(vec![Strategy::DirectLoader]), &page, ORIGINAL)
            .await
            .unwrap();

        assert_eq!(
            located,
            Located::Found(ExtractionContext::Frame(FrameRef {
                index: 0,
                name: None,
                url: SNAPSHOT.to_string(),
            }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn destroyed_context_during_redirect_keeps_polling() {
        let session = FakeWeb::new()
            .page(&loader_url(), SNAPSHOT_HTML)
            .flaky(&loader_url(), 2)
            .into_session();
        let page = session.open_context().await.unwrap();
        let start = tokio::time::Instant::now();

        let located = locate(&locator_with(vec![Strategy::DirectLoader]), &page, ORIGINAL)
            .await
            .unwrap();

        assert_eq!(located, Located::Found(ExtractionContext::TopLevel));
        // two torn-down queries, each followed by one poll interval
        assert_eq!(start.elapsed(), Duration::from_millis(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_failure_is_still_an_error() {
        let session = FakeWeb::new().failing(&loader_url()).into_session();
        let page = session.open_context().await.unwrap();

        let err = locate(&locator_with(vec![Strategy::DirectLoader]), &page, ORIGINAL)
            .await
            .unwrap_err();

        assert!(matches!(err, BrowserError::Navigation { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_within_budget_is_not_found() {
        let session = FakeWeb::new()
            .page(&loader_url(), "<html><body><p>Capturing…</p></body></html>")
            .frame(&loader_url(), Some("ads"), "https://ads.example.com/slot")
            .into_session();
        let page = session.open_context().await.unwrap();
        let start = tokio::time::Instant::now();

        let located = locate(&locator_with(vec![Strategy::DirectLoader]), &page, ORIGINAL)
            .await
            .unwrap();

        assert_eq!(located, Located::NotFound);
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }
}

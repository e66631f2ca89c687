//! Search-form strategy: type the original URL into the provider's search box.
//!
//! Results render either in the top-level document or inside a named frame.
//! The first snapshot link found there is followed; no link within the wait
//! budget means the provider holds no snapshot.

use super::{Located, SnapshotLocator};
use crate::browser::{ExtractionContext, NavigableContext, goto_bounded, wait_for_selector};
use crate::error::BrowserError;
use tracing::{debug, instrument, warn};

/// Search the provider for `original_url` and follow the first snapshot link.
///
/// # Returns
///
/// * `Located::Found(TopLevel)` with the page on the snapshot
/// * `Located::NotFound` if no snapshot link showed up within `snapshot_link_wait`
///
/// # Errors
///
/// A navigation failure, or [`BrowserError::Timeout`] when the search input
/// never rendered or the results never loaded.
#[instrument(level = "debug", skip_all, fields(url = %original_url))]
pub async fn locate<C: NavigableContext>(
    locator: &SnapshotLocator,
    page: &C,
    original_url: &str,
) -> Result<Located, BrowserError> {
    let config = locator.config();
    goto_bounded(page, &config.landing_url, config.navigation_timeout()).await?;

    let input = &config.search_input_selector;
    let ready = wait_for_selector(
        page,
        &ExtractionContext::TopLevel,
        input,
        config.search_input_wait(),
        config.poll_interval(),
    )
    .await?;
    if !ready {
        return Err(BrowserError::Timeout {
            waited: config.search_input_wait(),
            what: format!("search input {input}"),
        });
    }

    tokio::time::timeout(config.navigation_timeout(), page.submit_search(input, original_url))
        .await
        .map_err(|_| BrowserError::Timeout {
            waited: config.navigation_timeout(),
            what: "search results".to_string(),
        })??;

    let results = locator.results_root(page).await?;
    let Some(href) = locator.snapshot_href(page, &results).await? else {
        warn!("No snapshot link in search results");
        return Ok(Located::NotFound);
    };

    debug!(%href, "Following snapshot link");
    goto_bounded(page, &href, config.navigation_timeout()).await?;
    Ok(Located::Found(ExtractionContext::TopLevel))
}

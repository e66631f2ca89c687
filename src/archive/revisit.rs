//! Direct-navigation-with-revisit strategy.
//!
//! Submits search and capture in one request, lets the asynchronous capture
//! settle, then follows the snapshot link like the search-form strategy. Some
//! provider mirrors serve an intermediate shell on the first visit, so the
//! snapshot URL is navigated to a second time before waiting for the article.

use super::{Located, SnapshotLocator};
use crate::browser::{ExtractionContext, NavigableContext, goto_bounded, wait_for_selector};
use crate::error::BrowserError;
use tracing::{debug, instrument, warn};

/// Search and capture in one request, then visit the snapshot twice.
///
/// # Returns
///
/// * `Located::Found(TopLevel)` once the article selector renders
/// * `Located::NotFound` if no snapshot link appeared, or the snapshot never
///   rendered an article within `article_wait`
///
/// # Errors
///
/// Any navigation failure or navigation timeout.
#[instrument(level = "debug", skip_all, fields(url = %original_url))]
pub async fn locate<C: NavigableContext>(
    locator: &SnapshotLocator,
    page: &C,
    original_url: &str,
) -> Result<Located, BrowserError> {
    let config = locator.config();
    let run = format!("{}{}", config.run_url, urlencoding::encode(original_url));
    goto_bounded(page, &run, config.navigation_timeout()).await?;
    tokio::time::sleep(config.revisit_settle()).await;

    let results = locator.results_root(page).await?;
    let Some(href) = locator.snapshot_href(page, &results).await? else {
        warn!("No snapshot link after search+run");
        return Ok(Located::NotFound);
    };

    debug!(%href, "Revisiting snapshot");
    goto_bounded(page, &href, config.navigation_timeout()).await?;
    goto_bounded(page, &href, config.navigation_timeout()).await?;

    let rendered = wait_for_selector(
        page,
        &ExtractionContext::TopLevel,
        &config.article_selector,
        config.article_wait(),
        config.poll_interval(),
    )
    .await?;
    if !rendered {
        warn!(%href, "Snapshot never rendered an article");
        return Ok(Located::NotFound);
    }
    Ok(Located::Found(ExtractionContext::TopLevel))
}

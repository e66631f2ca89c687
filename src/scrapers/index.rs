//! Article link collection from the paginated index page.
//!
//! The default target is [HBR's "The Latest"](https://hbr.org/the-latest),
//! whose listing grows ten stories at a time behind a "load more" link.
//!
//! # URL Pattern
//!
//! Title anchors carry site-relative hrefs like `/2025/05/article-slug`,
//! resolved to absolute URLs like `https://hbr.org/2025/05/article-slug`.

use crate::browser::{ExtractionContext, NavigableContext, goto_bounded, wait_for_selector};
use crate::config::IndexConfig;
use crate::error::ConfigError;
use crate::models::ArticleLink;
use itertools::Itertools;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Resolve raw hrefs against `base`, keeping only http(s) URLs on the same
/// origin, deduplicated in first-seen order.
pub fn resolve_links<I, S>(base: &Url, hrefs: I) -> Vec<ArticleLink>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let origin = base.origin();
    hrefs
        .into_iter()
        .filter_map(|href| base.join(href.as_ref().trim()).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https") && url.origin() == origin)
        .unique()
        .map(ArticleLink::new)
        .collect()
}

/// Harvests article links from a paginated index page.
#[derive(Debug, Clone)]
pub struct LinkCollector {
    config: IndexConfig,
    base: Url,
}

impl LinkCollector {
    /// Create a collector for the configured index page.
    ///
    /// # Arguments
    ///
    /// * `config` - Index URL, selectors and pagination bounds
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `base_url` is not an absolute URL.
    pub fn new(config: IndexConfig) -> Result<Self, ConfigError> {
        let base = Url::parse(&config.base_url).map_err(|e| ConfigError::Invalid {
            field: "index.base_url",
            reason: e.to_string(),
        })?;
        Ok(Self { config, base })
    }

    /// Paginate the index and harvest article links.
    ///
    /// Never fails: a page that will not load or never shows its title
    /// selector yields an empty list.
    #[instrument(level = "info", skip_all, fields(index = %self.config.url))]
    pub async fn collect<C: NavigableContext>(&self, page: &C) -> Vec<ArticleLink> {
        let top = ExtractionContext::TopLevel;

        if let Err(e) = goto_bounded(page, &self.config.url, self.config.navigation_timeout()).await
        {
            error!(error = %e, "Failed to load index page");
            return Vec::new();
        }

        match wait_for_selector(
            page,
            &top,
            &self.config.title_selector,
            self.config.title_wait(),
            self.config.poll_interval(),
        )
        .await
        {
            Ok(true) => {}
            Ok(false) => {
                warn!(selector = %self.config.title_selector, "Article titles never appeared");
                return Vec::new();
            }
            Err(e) => {
                warn!(error = %e, "Failed waiting for article titles");
                return Vec::new();
            }
        }

        let pages = self.paginate(page).await;

        let hrefs = match page.attributes(&top, &self.config.title_selector, "href").await {
            Ok(hrefs) => hrefs,
            Err(e) => {
                error!(error = %e, "Failed to read article hrefs");
                return Vec::new();
            }
        };

        let links = resolve_links(&self.base, &hrefs);
        info!(count = links.len(), raw = hrefs.len(), pages, "Indexed article URLs");
        debug!(urls = ?links.iter().map(ArticleLink::as_str).collect::<Vec<_>>(), "Index URLs");
        links
    }

    /// Click "load more" until it disappears; returns how many clicks landed.
    async fn paginate<C: NavigableContext>(&self, page: &C) -> usize {
        let top = ExtractionContext::TopLevel;
        let control = &self.config.load_more_selector;
        let settle = self.config.settle_delay();
        let mut pages = 0;

        while pages < self.config.max_pages {
            match page.exists(&top, control).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(pages, "No load-more control; pagination exhausted");
                    return pages;
                }
                Err(e) => {
                    warn!(error = %e, "Load-more lookup failed; treating as exhausted");
                    return pages;
                }
            }

            let settled = async {
                tokio::select! {
                    response = page.wait_for_response(&self.config.pagination_patterns) => {
                        match response {
                            Ok(()) => true,
                            Err(e) => {
                                debug!(error = %e, "Response listener ended early");
                                sleep(settle).await;
                                false
                            }
                        }
                    }
                    _ = sleep(settle) => false,
                }
            };
            let (matched, clicked) = tokio::join!(settled, page.click(&top, control));

            if let Err(e) = clicked {
                debug!(error = %e, "Load-more control vanished; pagination exhausted");
                return pages;
            }
            pages += 1;
            debug!(page = pages, matched_response = matched, "Loaded more articles");
        }

        warn!(max_pages = self.config.max_pages, "Stopped paginating at page cap");
        pages
    }
}

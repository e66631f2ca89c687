//! Article text extraction from a snapshot DOM.
//!
//! Archive snapshots inline the original page's markup with the provider's
//! chrome mixed in, and the original site's layout changes often. Extraction
//! therefore walks short ordered candidate lists (first match wins) and
//! filters blocks through a denylist before trimming leading breadcrumbs.
//!
//! Everything here is pure: the same HTML always yields the same
//! [`ExtractedArticle`].

use crate::browser::{ExtractionContext, NavigableContext};
use crate::config::ExtractionConfig;
use crate::error::{BrowserError, ConfigError};
use crate::models::ExtractedArticle;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

static CONTENT_HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("#CONTENT h1").unwrap());
static ANY_HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static DOCUMENT_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static TITLE_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r" \|.*$").unwrap());

/// Body block selectors in priority order.
static BLOCK_CANDIDATES: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["#CONTENT p", "#CONTENT div", "article p"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

/// Where a title may come from, in priority order.
#[derive(Debug, Clone, Copy)]
enum TitleCandidate {
    Heading(&'static Lazy<Selector>),
    DocumentTitle,
}

static TITLE_CANDIDATES: [TitleCandidate; 3] = [
    TitleCandidate::Heading(&CONTENT_HEADING),
    TitleCandidate::Heading(&ANY_HEADING),
    TitleCandidate::DocumentTitle,
];

/// Whitespace-normalized visible text of an element.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Pulls an article's title and body out of snapshot HTML.
///
/// Built once from [`ExtractionConfig`] and shared across every link; it holds
/// no per-page state.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    denylist: Vec<String>,
    percentage: Regex,
    min_content_len: usize,
}

impl ContentExtractor {
    /// Create an extractor from the noise-filtering settings.
    ///
    /// # Arguments
    ///
    /// * `config` - Denylist, percentage pattern and minimum content length
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `percentage_pattern` is not a valid regex.
    pub fn new(config: &ExtractionConfig) -> Result<Self, ConfigError> {
        let percentage =
            Regex::new(&config.percentage_pattern).map_err(|e| ConfigError::Invalid {
                field: "extraction.percentage_pattern",
                reason: e.to_string(),
            })?;
        Ok(Self {
            denylist: config.denylist.clone(),
            percentage,
            min_content_len: config.min_content_len,
        })
    }

    /// Read the DOM of `ctx` and extract from it.
    ///
    /// # Errors
    ///
    /// Returns the [`BrowserError`] raised while serializing the scope's DOM,
    /// typically [`BrowserError::Detached`] when a frame went away.
    pub async fn extract_from<C: NavigableContext>(
        &self,
        page: &C,
        ctx: &ExtractionContext,
    ) -> Result<ExtractedArticle, BrowserError> {
        let html = page.html(ctx).await?;
        Ok(self.extract(&html))
    }

    /// Extract title and body from a full HTML document.
    ///
    /// # Returns
    ///
    /// An [`ExtractedArticle`] whose fields are empty when nothing usable
    /// was found. Never fails.
    pub fn extract(&self, html: &str) -> ExtractedArticle {
        let document = Html::parse_document(html);
        let title = extract_title(&document);
        let body = self.extract_body(&document);
        debug!(title_len = title.len(), body_len = body.len(), "Extracted snapshot content");
        ExtractedArticle { title, body }
    }

    fn extract_body(&self, document: &Html) -> String {
        let blocks = BLOCK_CANDIDATES
            .iter()
            .map(|selector| {
                document
                    .select(selector)
                    .map(element_text)
                    .filter(|text| !self.is_noise(text))
                    .collect::<Vec<_>>()
            })
            .find(|blocks| !blocks.is_empty())
            .unwrap_or_default();

        self.trim_leading_short(blocks).join("\n\n")
    }

    /// Empty, denylisted, or a bare loading percentage.
    pub fn is_noise(&self, text: &str) -> bool {
        let text = text.trim();
        text.is_empty()
            || self.denylist.iter().any(|phrase| phrase == text)
            || self.percentage.is_match(text)
    }

    /// Drop everything before the first block longer than the threshold.
    pub fn trim_leading_short(&self, blocks: Vec<String>) -> Vec<String> {
        match blocks
            .iter()
            .position(|b| b.chars().count() > self.min_content_len)
        {
            Some(start) => blocks.into_iter().skip(start).collect(),
            None => blocks,
        }
    }
}

fn extract_title(document: &Html) -> String {
    TITLE_CANDIDATES
        .iter()
        .find_map(|candidate| {
            let text = match candidate {
                TitleCandidate::Heading(selector) => {
                    document.select(selector).next().map(element_text)
                }
                TitleCandidate::DocumentTitle => document
                    .select(&DOCUMENT_TITLE)
                    .next()
                    .map(|el| TITLE_SUFFIX.replace(&element_text(el), "").trim().to_string()),
            }?;
            (!text.is_empty()).then_some(text)
        })
        .unwrap_or_default()
}

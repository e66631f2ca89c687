//! Browser automation seam.
//!
//! The pipeline talks to the browser only through two traits:
//!
//! - [`BrowserSession`]: one running browser, able to open fresh pages
//! - [`NavigableContext`]: one open page (tab); closing it consumes it
//!
//! DOM queries are scoped by an [`ExtractionContext`], which is either the
//! top-level document or one of its `iframe`/`frame` children. Archive search
//! results and some snapshots render inside a frame, so every query names the
//! scope it runs in.
//!
//! The production implementation in [`chrome`] drives Chromium over the
//! DevTools protocol. Tests use the scripted in-memory fake in `fake`.

pub mod chrome;
#[cfg(test)]
pub mod fake;

use crate::error::BrowserError;
use crate::poll::{PollOutcome, poll_until};
use serde::Deserialize;
use std::time::Duration;

/// A nested frame of the top-level document.
///
/// `index` is the frame's position among the document's `iframe, frame`
/// elements in document order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FrameRef {
    pub index: usize,
    pub name: Option<String>,
    pub url: String,
}

/// The DOM scope currently believed to hold the article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionContext {
    TopLevel,
    Frame(FrameRef),
}

/// A running browser able to open isolated pages.
pub trait BrowserSession {
    type Context: NavigableContext;

    /// Open a fresh blank page. The caller owns it and must close it.
    async fn open_context(&self) -> Result<Self::Context, BrowserError>;
}

/// One open page. Every method is scoped to this page only.
pub trait NavigableContext {
    /// Navigate the top-level document and wait for it to load.
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    /// URL of the top-level document.
    async fn current_url(&self) -> Result<String, BrowserError>;

    /// Type `text` into the top-level input matching `selector`, press Enter
    /// and wait for the resulting navigation.
    async fn submit_search(&self, selector: &str, text: &str) -> Result<(), BrowserError>;

    /// Whether any element in `ctx` matches `selector`.
    async fn exists(&self, ctx: &ExtractionContext, selector: &str) -> Result<bool, BrowserError>;

    /// Attribute `name` of every element matching `selector`, in document order.
    async fn attributes(
        &self,
        ctx: &ExtractionContext,
        selector: &str,
        name: &str,
    ) -> Result<Vec<String>, BrowserError>;

    /// Click the first element matching `selector`. Fails if there is none.
    async fn click(&self, ctx: &ExtractionContext, selector: &str) -> Result<(), BrowserError>;

    /// Frames hosted by the top-level document.
    async fn frames(&self) -> Result<Vec<FrameRef>, BrowserError>;

    /// Serialized DOM of the given scope.
    async fn html(&self, ctx: &ExtractionContext) -> Result<String, BrowserError>;

    /// Resolve once a network response whose URL contains any of `patterns`
    /// arrives. Unbounded; callers race it against a timer.
    async fn wait_for_response(&self, patterns: &[String]) -> Result<(), BrowserError>;

    /// Close the page, consuming it.
    async fn close(self) -> Result<(), BrowserError>;
}

/// First attribute value of the first element matching `selector`.
pub async fn first_attribute<C: NavigableContext>(
    page: &C,
    ctx: &ExtractionContext,
    selector: &str,
    name: &str,
) -> Result<Option<String>, BrowserError> {
    Ok(page.attributes(ctx, selector, name).await?.into_iter().next())
}

/// Wait until `selector` matches in `ctx`, polling every `interval`.
///
/// # Returns
///
/// `Ok(true)` once the selector matches, `Ok(false)` when `budget` expires
/// first.
///
/// # Errors
///
/// The first error raised by a query; the wait is abandoned.
pub async fn wait_for_selector<C: NavigableContext>(
    page: &C,
    ctx: &ExtractionContext,
    selector: &str,
    budget: Duration,
    interval: Duration,
) -> Result<bool, BrowserError> {
    let outcome = poll_until(budget, interval, move || async move {
        Ok::<_, BrowserError>(page.exists(ctx, selector).await?.then_some(()))
    })
    .await?;
    Ok(matches!(outcome, PollOutcome::Ready(())))
}

/// Navigate with an upper bound on how long the load may take.
///
/// # Errors
///
/// [`BrowserError::Timeout`] after `limit`, or the navigation's own error.
pub async fn goto_bounded<C: NavigableContext>(
    page: &C,
    url: &str,
    limit: Duration,
) -> Result<(), BrowserError> {
    tokio::time::timeout(limit, page.goto(url))
        .await
        .map_err(|_| BrowserError::Timeout {
            waited: limit,
            what: format!("navigation to {url}"),
        })?
}

/// Find the first frame whose `name` attribute equals `name`.
pub async fn named_frame<C: NavigableContext>(
    page: &C,
    name: &str,
) -> Result<Option<FrameRef>, BrowserError> {
    Ok(page
        .frames()
        .await?
        .into_iter()
        .find(|frame| frame.name.as_deref() == Some(name)))
}

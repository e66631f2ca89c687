//! Scripted in-memory browser for tests.
//!
//! A [`FakeWeb`] maps URLs to HTML documents. Selectors are evaluated with
//! `scraper` against the stored HTML, clicks can swap the page for another
//! document (emulating "load more"), and the session records how many pages
//! are open at any moment.

use super::{BrowserSession, ExtractionContext, FrameRef, NavigableContext};
use crate::error::BrowserError;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Default)]
struct FakeDoc {
    html: String,
    frames: Vec<(Option<String>, String)>,
    clicks: HashMap<String, (String, Option<String>)>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeWeb {
    docs: HashMap<String, FakeDoc>,
    searches: HashMap<String, String>,
    failing: HashSet<String>,
    flaky: HashMap<String, usize>,
}

impl FakeWeb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.docs.entry(url.to_string()).or_default().html = html.to_string();
        self
    }

    /// Attach a frame (`name`, `src`) to the document at `url`.
    pub fn frame(mut self, url: &str, name: Option<&str>, src: &str) -> Self {
        self.docs
            .entry(url.to_string())
            .or_default()
            .frames
            .push((name.map(String::from), src.to_string()));
        self
    }

    /// Clicking `selector` on `url` turns the page into `next_url`, optionally
    /// emitting a network response for `response_url`.
    pub fn on_click(
        mut self,
        url: &str,
        selector: &str,
        next_url: &str,
        response_url: Option<&str>,
    ) -> Self {
        self.docs.entry(url.to_string()).or_default().clicks.insert(
            selector.to_string(),
            (next_url.to_string(), response_url.map(String::from)),
        );
        self
    }

    /// Submitting `query` into a search box navigates to `results_url`.
    pub fn search(mut self, query: &str, results_url: &str) -> Self {
        self.searches
            .insert(query.to_string(), results_url.to_string());
        self
    }

    /// Navigating to `url` fails with a navigation error.
    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    /// The first `times` DOM queries against `url` fail as if the page had
    /// navigated away mid-evaluation.
    pub fn flaky(mut self, url: &str, times: usize) -> Self {
        self.flaky.insert(url.to_string(), times);
        self
    }

    pub fn into_session(self) -> FakeSession {
        FakeSession {
            web: Arc::new(self),
            stats: Arc::new(Mutex::new(SessionStats::default())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub open: usize,
    pub max_open: usize,
    pub opened: usize,
    pub closed: usize,
    pub visits: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FakeSession {
    web: Arc<FakeWeb>,
    stats: Arc<Mutex<SessionStats>>,
}

impl FakeSession {
    pub fn stats(&self) -> SessionStats {
        self.stats.lock().unwrap().clone()
    }
}

impl BrowserSession for FakeSession {
    type Context = FakeContext;

    async fn open_context(&self) -> Result<FakeContext, BrowserError> {
        let mut stats = self.stats.lock().unwrap();
        stats.open += 1;
        stats.opened += 1;
        stats.max_open = stats.max_open.max(stats.open);
        Ok(FakeContext {
            flaky: Mutex::new(self.web.flaky.clone()),
            web: Arc::clone(&self.web),
            stats: Arc::clone(&self.stats),
            current: Mutex::new("about:blank".to_string()),
            responses: Mutex::new(Vec::new()),
        })
    }
}

pub struct FakeContext {
    web: Arc<FakeWeb>,
    stats: Arc<Mutex<SessionStats>>,
    current: Mutex<String>,
    responses: Mutex<Vec<String>>,
    flaky: Mutex<HashMap<String, usize>>,
}

impl FakeContext {
    fn trip(&self, url: &str) -> Result<(), BrowserError> {
        let mut flaky = self.flaky.lock().unwrap();
        match flaky.get_mut(url) {
            Some(left) if *left > 0 => {
                *left -= 1;
                Err(BrowserError::Script(
                    "Execution context was destroyed, most likely because of a navigation".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }

    fn current(&self) -> String {
        self.current.lock().unwrap().clone()
    }

    fn doc(&self, url: &str) -> Result<&FakeDoc, BrowserError> {
        self.web
            .docs
            .get(url)
            .ok_or_else(|| BrowserError::Detached(format!("no document at {url}")))
    }

    fn scope_url(&self, ctx: &ExtractionContext) -> Result<String, BrowserError> {
        match ctx {
            ExtractionContext::TopLevel => Ok(self.current()),
            ExtractionContext::Frame(frame) => {
                let doc = self.doc(&self.current())?;
                doc.frames
                    .get(frame.index)
                    .map(|(_, src)| src.clone())
                    .ok_or_else(|| BrowserError::Detached(format!("frame {} detached", frame.index)))
            }
        }
    }

    fn select<T>(
        &self,
        ctx: &ExtractionContext,
        selector: &str,
        f: impl FnOnce(&Html, &Selector) -> T,
    ) -> Result<T, BrowserError> {
        let url = self.scope_url(ctx)?;
        self.trip(&url)?;
        let doc = self.doc(&url)?;
        let selector = Selector::parse(selector)
            .map_err(|e| BrowserError::Script(format!("bad selector {selector}: {e}")))?;
        let html = Html::parse_document(&doc.html);
        Ok(f(&html, &selector))
    }
}

impl NavigableContext for FakeContext {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.stats.lock().unwrap().visits.push(url.to_string());
        if self.web.failing.contains(url) || !self.web.docs.contains_key(url) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_RESET".to_string(),
            });
        }
        *self.current.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.current())
    }

    async fn submit_search(&self, selector: &str, text: &str) -> Result<(), BrowserError> {
        if !self.exists(&ExtractionContext::TopLevel, selector).await? {
            return Err(BrowserError::Detached(format!("no element matches {selector}")));
        }
        let target = self.web.searches.get(text).cloned().ok_or_else(|| {
            BrowserError::Navigation {
                url: format!("search for {text}"),
                reason: "no results page".to_string(),
            }
        })?;
        self.goto(&target).await
    }

    async fn exists(&self, ctx: &ExtractionContext, selector: &str) -> Result<bool, BrowserError> {
        self.select(ctx, selector, |html, sel| html.select(sel).next().is_some())
    }

    async fn attributes(
        &self,
        ctx: &ExtractionContext,
        selector: &str,
        name: &str,
    ) -> Result<Vec<String>, BrowserError> {
        self.select(ctx, selector, |html, sel| {
            html.select(sel)
                .filter_map(|el| el.value().attr(name).map(String::from))
                .collect()
        })
    }

    async fn click(&self, ctx: &ExtractionContext, selector: &str) -> Result<(), BrowserError> {
        if !self.exists(ctx, selector).await? {
            return Err(BrowserError::Detached(format!("no element matches {selector}")));
        }
        let url = self.scope_url(ctx)?;
        if let Some((next, response)) = self.doc(&url)?.clicks.get(selector).cloned() {
            *self.current.lock().unwrap() = next;
            if let Some(response) = response {
                self.responses.lock().unwrap().push(response);
            }
        }
        Ok(())
    }

    async fn frames(&self) -> Result<Vec<FrameRef>, BrowserError> {
        let current = self.current();
        self.trip(&current)?;
        let doc = self.doc(&current)?;
        Ok(doc
            .frames
            .iter()
            .enumerate()
            .map(|(index, (name, url))| FrameRef {
                index,
                name: name.clone(),
                url: url.clone(),
            })
            .collect())
    }

    async fn html(&self, ctx: &ExtractionContext) -> Result<String, BrowserError> {
        let url = self.scope_url(ctx)?;
        Ok(self.doc(&url)?.html.clone())
    }

    async fn wait_for_response(&self, patterns: &[String]) -> Result<(), BrowserError> {
        loop {
            {
                let mut responses = self.responses.lock().unwrap();
                if let Some(pos) = responses
                    .iter()
                    .position(|r| patterns.iter().any(|p| r.contains(p.as_str())))
                {
                    responses.remove(pos);
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    async fn close(self) -> Result<(), BrowserError> {
        let mut stats = self.stats.lock().unwrap();
        stats.open -= 1;
        stats.closed += 1;
        Ok(())
    }
}

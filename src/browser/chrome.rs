//! Chromium backend driven over the DevTools protocol with `chromiumoxide`.
//!
//! Scoped DOM queries run as small JavaScript expressions against either
//! `document` or a frame's `contentDocument`, returned by value. A frame whose
//! document can no longer be reached raises an exception, which surfaces as
//! [`BrowserError::Detached`].

use super::{BrowserSession, ExtractionContext, FrameRef, NavigableContext};
use crate::config::BrowserSettings;
use crate::error::BrowserError;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, EventResponseReceived};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// One launched Chromium process plus the task pumping its protocol handler.
pub struct ChromeSession {
    browser: Browser,
    handler: JoinHandle<()>,
    user_agent: String,
    stealth: bool,
}

impl ChromeSession {
    /// Launch Chromium. Failure here is fatal to the run.
    #[instrument(level = "info", skip_all, fields(headless = settings.headless))]
    pub async fn launch(settings: &BrowserSettings) -> Result<Self, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .window_size(settings.window_width, settings.window_height)
            .args(settings.args.clone());
        if !settings.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler event error");
                }
            }
        });

        info!("Browser launched");
        Ok(Self {
            browser,
            handler,
            user_agent: settings.user_agent.clone(),
            stealth: settings.stealth,
        })
    }

    /// Close the browser and stop the handler task.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "Failed to close browser cleanly");
        }
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "Failed waiting for browser process to exit");
        }
        self.handler.abort();
        info!("Browser closed");
    }
}

impl BrowserSession for ChromeSession {
    type Context = ChromeContext;

    async fn open_context(&self) -> Result<ChromeContext, BrowserError> {
        let page = self.browser.new_page("about:blank").await?;
        if self.stealth {
            page.enable_stealth_mode_with_agent(&self.user_agent).await?;
        } else {
            page.set_user_agent(self.user_agent.clone()).await?;
        }
        page.execute(EnableParams::default()).await?;
        Ok(ChromeContext { page })
    }
}

/// One Chromium tab.
pub struct ChromeContext {
    page: Page,
}

/// JavaScript string literal for `value`.
fn js_str(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Expression evaluating to the root document of `ctx`, throwing if gone.
fn root_expr(ctx: &ExtractionContext) -> String {
    match ctx {
        ExtractionContext::TopLevel => "document".to_string(),
        ExtractionContext::Frame(frame) => format!(
            "(() => {{ \
                const el = document.querySelectorAll('iframe, frame')[{index}]; \
                const doc = el && el.contentDocument; \
                if (!doc) throw new Error('frame {index} detached'); \
                return doc; \
            }})()",
            index = frame.index
        ),
    }
}

impl ChromeContext {
    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T, BrowserError> {
        let mut params = EvaluateParams::new(script);
        params.return_by_value = Some(true);
        params.await_promise = Some(true);
        let result = self.page.evaluate_expression(params).await.map_err(|e| {
            let message = e.to_string();
            if message.contains("detached") {
                BrowserError::Detached(message)
            } else {
                BrowserError::Script(message)
            }
        })?;
        result
            .into_value::<T>()
            .map_err(|e| BrowserError::Script(e.to_string()))
    }
}

impl NavigableContext for ChromeContext {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn submit_search(&self, selector: &str, text: &str) -> Result<(), BrowserError> {
        let input = self.page.find_element(selector).await?;
        input.click().await?;
        input.type_str(text).await?;
        input.press_key("Enter").await?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| BrowserError::Navigation {
                url: format!("search for {text}"),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn exists(&self, ctx: &ExtractionContext, selector: &str) -> Result<bool, BrowserError> {
        let script = format!(
            "(() => {{ const root = {root}; return root.querySelector({sel}) !== null; }})()",
            root = root_expr(ctx),
            sel = js_str(selector)
        );
        self.eval(script).await
    }

    async fn attributes(
        &self,
        ctx: &ExtractionContext,
        selector: &str,
        name: &str,
    ) -> Result<Vec<String>, BrowserError> {
        let script = format!(
            "(() => {{ const root = {root}; \
                return Array.from(root.querySelectorAll({sel})) \
                    .map(el => el.getAttribute({name})) \
                    .filter(v => v !== null); }})()",
            root = root_expr(ctx),
            sel = js_str(selector),
            name = js_str(name)
        );
        self.eval(script).await
    }

    async fn click(&self, ctx: &ExtractionContext, selector: &str) -> Result<(), BrowserError> {
        let script = format!(
            "(() => {{ const root = {root}; const el = root.querySelector({sel}); \
                if (!el) return false; el.click(); return true; }})()",
            root = root_expr(ctx),
            sel = js_str(selector)
        );
        if self.eval::<bool>(script).await? {
            Ok(())
        } else {
            Err(BrowserError::Detached(format!("no element matches {selector}")))
        }
    }

    async fn frames(&self) -> Result<Vec<FrameRef>, BrowserError> {
        let script = "(() => Array.from(document.querySelectorAll('iframe, frame')).map((el, index) => { \
                let url = el.src || ''; \
                try { if (el.contentWindow && el.contentWindow.location.href !== 'about:blank') \
                    { url = el.contentWindow.location.href; } } catch (_) {} \
                return { index, name: el.getAttribute('name'), url }; \
            }))()"
            .to_string();
        self.eval(script).await
    }

    async fn html(&self, ctx: &ExtractionContext) -> Result<String, BrowserError> {
        match ctx {
            ExtractionContext::TopLevel => Ok(self.page.content().await?),
            ExtractionContext::Frame(_) => {
                let script = format!(
                    "(() => {{ const root = {root}; return root.documentElement.outerHTML; }})()",
                    root = root_expr(ctx)
                );
                self.eval(script).await
            }
        }
    }

    async fn wait_for_response(&self, patterns: &[String]) -> Result<(), BrowserError> {
        let mut responses = self.page.event_listener::<EventResponseReceived>().await?;
        while let Some(event) = responses.next().await {
            let url = &event.response.url;
            if patterns.iter().any(|p| url.contains(p.as_str())) {
                debug!(%url, "Matched pagination response");
                return Ok(());
            }
        }
        Err(BrowserError::Detached("response stream ended".to_string()))
    }

    async fn close(self) -> Result<(), BrowserError> {
        self.page.close().await?;
        Ok(())
    }
}

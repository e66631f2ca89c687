//! Error types shared across the acquisition pipeline.
//!
//! [`BrowserError`] is the single classified fault type for everything that
//! touches the browser. Anything surfacing as a `BrowserError` is considered
//! transient and eligible for retry; confirmed absence of a snapshot is never
//! an error (see [`crate::archive::Located`]).

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    /// Chromium could not be started. The only variant that ends a run.
    #[error("browser launch failed: {0}")]
    Launch(String),

    /// A page load was refused, reset or answered with a network error.
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// A bounded wait ran out. `what` names the thing being waited for.
    #[error("timed out after {waited:?} waiting for {what}")]
    Timeout { waited: Duration, what: String },

    /// A DOM query threw, including "execution context was destroyed" when
    /// the page navigated mid-evaluation.
    #[error("script evaluation failed: {0}")]
    Script(String),

    /// The frame or element a query was scoped to no longer exists.
    #[error("context detached: {0}")]
    Detached(String),

    /// Any other DevTools protocol failure.
    #[error("devtools protocol error: {0}")]
    Cdp(String),
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        BrowserError::Cdp(err.to_string())
    }
}

/// Errors raised while loading the YAML pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Terminal failure after every retry attempt was consumed.
#[derive(Debug, Error)]
#[error("gave up after {attempts} attempts: {last}")]
pub struct RetryExhausted<E: std::fmt::Display + std::fmt::Debug> {
    /// How many times the work was invoked.
    pub attempts: usize,
    /// Error returned by the final attempt.
    pub last: E,
}

//! Bounded retry with fixed backoff for snapshot acquisition.
//!
//! Only `Err` outcomes are retried. A confirmed absence of a snapshot comes
//! back as an `Ok` value and is returned immediately, so it never consumes an
//! attempt.
//!
//! # Retry Strategy
//!
//! - `max_attempts` total invocations (at least one)
//! - The same `backoff` delay between consecutive attempts, none after the last
//! - Exhaustion surfaces [`RetryExhausted`] carrying the last error

use crate::config::RetryConfig;
use crate::error::RetryExhausted;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{error, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: usize,
    backoff: Duration,
}

impl RetryPolicy {
    /// Create a policy; `max_attempts` below one is treated as one.
    pub fn new(max_attempts: usize, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.backoff())
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Invoke `attempt` until it returns `Ok` or the attempts run out.
    ///
    /// # Arguments
    ///
    /// * `label` - Identifies the work in log lines (usually the article URL)
    /// * `attempt` - Produces a fresh future for every try
    #[instrument(level = "info", skip_all, fields(%label))]
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut attempt: F) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display + fmt::Debug,
    {
        let total_t0 = Instant::now();
        let mut tries = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            tries += 1;
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let elapsed_ms_attempt = attempt_t0.elapsed().as_millis();
                    let elapsed_ms_total = total_t0.elapsed().as_millis();

                    if tries >= self.max_attempts {
                        error!(
                            attempt = tries,
                            max = self.max_attempts,
                            elapsed_ms_attempt,
                            elapsed_ms_total,
                            error = %e,
                            "Exhausted retries"
                        );
                        return Err(RetryExhausted {
                            attempts: tries,
                            last: e,
                        });
                    }

                    warn!(
                        attempt = tries,
                        max = self.max_attempts,
                        elapsed_ms_attempt,
                        elapsed_ms_total,
                        delay = ?self.backoff,
                        error = %e,
                        "Attempt failed; backing off"
                    );
                    sleep(self.backoff).await;
                }
            }
        }
    }
}

//! Poll-with-deadline primitive used for every bounded wait.
//!
//! Business logic never sleeps in a loop on its own; it hands a probe to
//! [`poll_until`] which re-evaluates it on a fixed interval until it yields a
//! value or the budget runs out. Timing goes through `tokio::time`, so tests
//! drive it with the paused virtual clock.

use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Result of a bounded poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready(T),
    TimedOut,
}

/// Evaluate `probe` until it returns `Some`, an error, or `budget` elapses.
///
/// The probe always runs at least once, even with a zero budget. Errors from
/// the probe end the poll immediately and are propagated unchanged.
pub async fn poll_until<T, E, F, Fut>(
    budget: Duration,
    interval: Duration,
    mut probe: F,
) -> Result<PollOutcome<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let deadline = Instant::now() + budget;
    loop {
        if let Some(value) = probe().await? {
            return Ok(PollOutcome::Ready(value));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(PollOutcome::TimedOut);
        }
        sleep(interval.min(deadline - now)).await;
    }
}

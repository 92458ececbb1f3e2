//! Bounded fixed-interval readiness polling.
//!
//! Imports only from `crate::domain`. Sleeps go through `tokio::time`, so
//! tests can drive the clock with `start_paused`.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::domain::PollError;

/// How often to probe and how long to keep trying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl From<crate::domain::PollSettings> for PollConfig {
    fn from(settings: crate::domain::PollSettings) -> Self {
        Self {
            interval: settings.interval(),
            timeout: settings.timeout(),
        }
    }
}

/// Probe until it reports ready, errors, `config.timeout` runs out, or
/// `cancel` completes. Pass `std::future::pending()` to wait without a
/// cancellation source.
///
/// The first probe runs immediately. After a "not ready" answer the poller
/// sleeps `interval`; if the next attempt would start past the deadline it
/// sleeps out the remainder and gives up instead. A probe still running at
/// the deadline is dropped, so the wait never outlasts `config.timeout`.
///
/// # Errors
///
/// - [`PollError::InvalidInterval`] if `interval` is zero.
/// - [`PollError::Probe`] with the probe's first error; no further attempts.
/// - [`PollError::Timeout`] once the deadline has passed.
/// - [`PollError::Cancelled`] if `cancel` completes first.
pub async fn poll_until_cancelled<F, Fut, E, C>(
    config: PollConfig,
    mut probe: F,
    cancel: C,
) -> Result<(), PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    C: Future<Output = ()>,
{
    if config.interval.is_zero() {
        return Err(PollError::InvalidInterval);
    }
    tokio::pin!(cancel);

    let started = Instant::now();
    let timed_out = || PollError::Timeout {
        elapsed: started.elapsed(),
        timeout: config.timeout,
    };
    // `None` when the deadline is beyond what the clock can represent.
    let deadline = started.checked_add(config.timeout);
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let ready = tokio::select! {
            biased;
            () = &mut cancel => return Err(PollError::Cancelled),
            outcome = probe() => outcome.map_err(PollError::Probe)?,
            () = sleep_until_deadline(deadline) => {
                tracing::debug!(attempt, "readiness probe still running at deadline");
                return Err(timed_out());
            }
        };
        let elapsed = started.elapsed();
        tracing::debug!(attempt, ready, ?elapsed, "readiness probe");
        if ready {
            return Ok(());
        }

        let next_attempt = elapsed.saturating_add(config.interval);
        let (wait, give_up) = if next_attempt > config.timeout {
            (config.timeout.saturating_sub(elapsed), true)
        } else {
            (config.interval, false)
        };
        tokio::select! {
            biased;
            () = &mut cancel => return Err(PollError::Cancelled),
            () = tokio::time::sleep(wait) => {}
        }
        if give_up {
            return Err(timed_out());
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────

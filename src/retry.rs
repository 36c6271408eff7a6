//! Bounded exponential backoff for transient page failures.
//!
//! The transition out of a failed attempt is a pure function
//! ([`RetryPolicy::next`]) so the schedule is testable without sleeping.

use crate::error::ScrapeError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry budget and backoff base shared by every page fetch of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each following retry
    pub backoff_base_ms: u64,
}

/// What to do after attempt number `attempt` failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep `delay`, then make attempt number `attempt`.
    Retry { attempt: u32, delay: Duration },
    /// Stop and surface the error.
    GiveUp,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_base_ms: u64) -> Self {
        Self { max_retries, backoff_base_ms }
    }

    /// Backoff before retry `attempt + 1`: `base * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.min(20);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(factor))
    }

    /// Decides the transition after attempt `attempt` (0-based) failed with `err`.
    ///
    /// Non-transient errors give up immediately; transient ones retry until
    /// `max_retries` retries have been spent.
    pub fn next(&self, attempt: u32, err: &ScrapeError) -> RetryDecision {
        if !err.is_transient() || attempt >= self.max_retries {
            return RetryDecision::GiveUp;
        }
        RetryDecision::Retry { attempt: attempt + 1, delay: self.delay_for(attempt) }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, 1000)
    }
}

/// Runs `operation` until it succeeds, fails permanently, or the retry
/// budget is spent. The last error is returned on give-up.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, ScrapeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScrapeError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        match policy.next(attempt, &err) {
            RetryDecision::GiveUp => return Err(err),
            RetryDecision::Retry { attempt: next, delay } => {
                warn!(
                    attempt = next,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying after backoff"
                );
                tokio::time::sleep(delay).await;
                attempt = next;
            }
        }
    }
}

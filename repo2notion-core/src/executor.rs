//! Rate-limited, retrying executor for remote calls.
//!
//! The remote API enforces a concurrency ceiling and a requests-per-second
//! ceiling at the same time. [`RateLimitedExecutor::schedule`] wraps one remote
//! call so that
//!
//! - at most `max_concurrent` calls are in flight across every caller sharing the executor,
//! - consecutive call starts are at least `min_interval` apart, and
//! - a failed call is retried with exponential backoff (`base_delay`, `2 * base_delay`,
//!   `4 * base_delay`, ...) up to `max_attempts` attempts in total, after which the last
//!   error is returned.
//!
//! The start gate applies to every attempt, retries included, and no concurrency
//! permit is held while backing off. One executor instance is built at startup and
//! shared (`Arc`) by everything that talks to the remote store.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::{AcquireError, Mutex, Semaphore};
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, warn};

/// Largest accepted `max_attempts`. The backoff stops doubling after the 16th failure,
/// so larger values would repeat the same delay.
pub const MAX_ATTEMPTS: u32 = 17;

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each later one.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Delay slept after the `failed_attempt`-th failure (1-based).
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(MAX_ATTEMPTS - 1);
        self.base_delay.saturating_mul(1 << exponent)
    }

    /// Run `op` until it succeeds or `max_attempts` attempts have failed.
    ///
    /// The error of the final attempt is returned unchanged.
    pub async fn run<T, E, F, Fut>(&self, what: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(what, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if attempt >= max_attempts => {
                    warn!(what, attempt, error = %e, "Giving up after final attempt");
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        what,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Attempt failed, backing off"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Settings for [`RateLimitedExecutor`], as they appear in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub max_concurrent: usize,
    pub min_interval_ms: u64,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            min_interval_ms: 200,
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

impl ExecutorConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
        }
    }
}

/// Concurrency cap + start-interval gate + retry loop around remote operations.
pub struct RateLimitedExecutor {
    permits: Semaphore,
    min_interval: Duration,
    last_start: Mutex<Option<Instant>>,
    retry: RetryPolicy,
}

impl RateLimitedExecutor {
    pub fn new(max_concurrent: usize, min_interval: Duration, retry: RetryPolicy) -> Self {
        Self {
            permits: Semaphore::new(max_concurrent.max(1)),
            min_interval,
            last_start: Mutex::new(None),
            retry,
        }
    }

    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self::new(
            config.max_concurrent,
            Duration::from_millis(config.min_interval_ms),
            config.retry_policy(),
        )
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Run `op` under the concurrency cap and start gate, retrying on failure.
    ///
    /// `op` is invoked once per attempt and must build a fresh future each time.
    pub async fn schedule<T, E, F, Fut>(&self, what: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display + From<AcquireError>,
    {
        self.retry
            .run(what, || {
                let attempt = op();
                async move {
                    let _permit = self.permits.acquire().await?;
                    self.wait_turn().await;
                    attempt.await
                }
            })
            .await
    }

    /// Block until `min_interval` has passed since the previous start, then record this start.
    async fn wait_turn(&self) {
        let mut last_start = self.last_start.lock().await;
        if let Some(previous) = *last_start {
            let ready_at = previous + self.min_interval;
            if ready_at > Instant::now() {
                sleep_until(ready_at).await;
            }
        }
        *last_start = Some(Instant::now());
    }
}

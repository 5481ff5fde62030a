//! Retry with polling for eventually-consistent UI state.
//!
//! The rendered page lags the input that changed it. Waits and assertions
//! therefore poll a check until it passes or a time budget runs out, instead
//! of reading once.

use crate::result::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};

/// Default timeout for actions and assertions (5 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Default polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total timeout duration
    pub timeout: Duration,
    /// Interval between retry attempts
    pub poll_interval: Duration,
    /// Maximum number of attempts (0 = unlimited within timeout)
    pub max_retries: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_retries: 0,
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with timeout
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_retries: 0,
        }
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set maximum attempts
    #[must_use]
    pub const fn with_max_retries(mut self, max: usize) -> Self {
        self.max_retries = max;
        self
    }

    /// Short timeout, fast polling
    #[must_use]
    pub const fn fast() -> Self {
        Self {
            timeout: Duration::from_millis(500),
            poll_interval: Duration::from_millis(10),
            max_retries: 0,
        }
    }

    /// Timeout in whole milliseconds
    #[must_use]
    pub const fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

/// Outcome of one check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    /// Condition met
    Done(T),
    /// Condition not met yet, with the reason
    Retry(String),
}

/// Details of a check that never passed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryError {
    /// Last failure reason
    pub message: String,
    /// Number of attempts made
    pub attempts: usize,
    /// Total duration of all attempts
    pub duration: Duration,
}

impl std::fmt::Display for RetryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (after {} attempt(s), {:.2}s)",
            self.message,
            self.attempts,
            self.duration.as_secs_f64()
        )
    }
}

/// Poll `check` until it returns [`Attempt::Done`].
///
/// A hard error from `check` stops polling at once. When the timeout or the
/// attempt limit is reached, `on_timeout` turns the last reason into the
/// returned error. The check always runs at least once.
pub async fn retry<T, F, Fut, E>(config: &RetryConfig, mut check: F, on_timeout: E) -> ProbeResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<Attempt<T>>>,
    E: FnOnce(RetryError) -> ProbeError,
{
    let start = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;

        let reason = match check().await? {
            Attempt::Done(value) => return Ok(value),
            Attempt::Retry(reason) => reason,
        };

        let out_of_time = start.elapsed() >= config.timeout;
        let out_of_attempts = config.max_retries > 0 && attempts >= config.max_retries;
        if out_of_time || out_of_attempts {
            return Err(on_timeout(RetryError {
                message: reason,
                attempts,
                duration: start.elapsed(),
            }));
        }

        tokio::time::sleep(config.poll_interval).await;
    }
}

//! Bounded retry with exponential backoff.
//!
//! One combinator instead of per-call-site retry loops: attempt the
//! operation, sleep for an exponentially growing interval on failure, give
//! up after the configured number of attempts.

use std::future::Future;
use std::time::Duration;

/// Retry schedule: `max_attempts` tries, sleeping `initial_delay * 2^n`
/// between attempt `n` and `n + 1`.
#[derive(Clone, Copy, Debug)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        assert!(max_attempts > 0, "at least one attempt is required");
        Self {
            max_attempts,
            initial_delay,
        }
    }

    /// Delay to sleep after a failed attempt (0-based).
    fn delay_after(&self, attempt: u32) -> Duration {
        self.initial_delay * 2u32.saturating_pow(attempt)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(500))
    }
}

/// Run `op` until it succeeds or the schedule is exhausted.
///
/// Returns the first success, or the error from the final attempt.
pub async fn retry_with_backoff<T, E, F, Fut>(config: RetryConfig, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= config.max_attempts {
                    return Err(err);
                }
                let delay = config.delay_after(attempt - 1);
                tracing::debug!(
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying after backoff"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

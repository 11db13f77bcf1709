//! Caller-level retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use notegen_adapters::CompletionResult;
use notegen_config::RetryConfig;
use tokio::time::sleep;
use tracing::warn;

/// Retries transient completion failures with doubling delays.
///
/// Only errors whose `is_retryable()` holds (timeouts and unavailability) are
/// retried. A malformed response is returned on first sight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Creates a policy. `max_attempts` counts the first call and is raised to one if zero.
    #[must_use]
    pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay: max_delay.max(initial_delay),
        }
    }

    /// A policy that makes exactly one attempt.
    #[must_use]
    pub fn single_attempt() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Builds the policy from the `[retry]` table.
    #[must_use]
    pub fn from_config(config: RetryConfig) -> Self {
        Self::new(config.max_attempts, config.initial_delay(), config.max_delay())
    }

    /// Returns the attempt limit.
    #[must_use]
    pub const fn max_attempts(self) -> u32 {
        self.max_attempts
    }

    /// Returns the delay slept before retry number `retry` (zero-based).
    #[must_use]
    pub fn delay_for(self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Runs `operation` until it succeeds, fails permanently, or the attempt
    /// limit is reached. The closure receives the one-based attempt number.
    ///
    /// # Errors
    ///
    /// Returns the last error produced by `operation`.
    pub async fn run<T, F, Fut>(self, label: &str, mut operation: F) -> CompletionResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = CompletionResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt - 1);
                    warn!(
                        label,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "completion failed; retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

//! Retry with exponential backoff.
//!
//! The wait after failed attempt `n` (0-based) is `base * 2^n`, capped at
//! `max_delay`. No wait follows the final attempt.

use std::fmt::Display;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::DownloadConfig;

/// How many times to try an operation and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Wait after the first failure.
    pub base_delay: Duration,
    /// Cap for any single wait.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&DownloadConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &DownloadConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_secs(config.backoff_base_secs),
            max_delay: Duration::from_secs(config.max_backoff_secs),
        }
    }

    /// A policy that retries without sleeping.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Attempts that will actually be made.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Wait after failed attempt `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Run `operation` under `policy`, sleeping with `std::thread::sleep`.
///
/// The operation receives the 0-based attempt number. Returns the first
/// success or the last error.
pub fn run_with_retry<T, E, F>(policy: &RetryPolicy, label: &str, operation: F) -> Result<T, E>
where
    E: Display,
    F: FnMut(u32) -> Result<T, E>,
{
    run_with_retry_using(policy, label, &std::thread::sleep, operation)
}

/// [`run_with_retry`] with an injectable sleep.
pub fn run_with_retry_using<T, E, F>(
    policy: &RetryPolicy,
    label: &str,
    sleep: &dyn Fn(Duration),
    mut operation: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut(u32) -> Result<T, E>,
{
    let attempts = policy.attempts();
    let mut attempt = 0;
    loop {
        match operation(attempt) {
            Ok(value) => {
                if attempt > 0 {
                    debug!(op = label, attempts = attempt + 1, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt + 1 < attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    op = label,
                    error = %e,
                    attempt = attempt + 1,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Attempt failed, retrying"
                );
                sleep(delay);
                attempt += 1;
            }
            Err(e) => {
                warn!(
                    op = label,
                    error = %e,
                    attempts = attempts,
                    "All attempts failed"
                );
                return Err(e);
            }
        }
    }
}

//! Retry utilities for the sheet export fetch.
//!
//! Every failure is treated as transient. Waits grow linearly with the
//! attempt number and carry uniform jitter:
//! - attempt 1 fails: wait `U(min, max) * 1`
//! - attempt 2 fails: wait `U(min, max) * 2`
//! - the final attempt never waits

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::FeedError;

/// Default retry configuration
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_MIN_DELAY_MS: u64 = 1000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 3000;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the first
    pub max_attempts: u32,
    /// Lower bound of the per-attempt jitter factor
    pub min_delay: Duration,
    /// Upper bound of the per-attempt jitter factor
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_delay: Duration::from_millis(DEFAULT_MIN_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with custom settings
    pub fn new(max_attempts: u32, min_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            min_delay: Duration::from_millis(min_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    /// Same delays, different attempt budget.
    pub fn with_attempts(&self, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..self.clone()
        }
    }

    /// Wait after the 1-based `attempt` failed.
    pub fn delay_for_attempt<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let min = self.min_delay.as_secs_f64();
        let max = self.max_delay.as_secs_f64();
        let factor = if max > min { rng.gen_range(min..max) } else { min };
        Duration::from_secs_f64(factor * f64::from(attempt))
    }
}

/// Run `operation` until it succeeds or the attempt budget is spent.
///
/// A budget of zero makes no attempt and reports exhaustion straight away.
pub async fn with_backoff<T, E, F, Fut>(config: &RetryConfig, mut operation: F) -> Result<T, FeedError>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut last_error: Option<String> = None;

    for attempt in 1..=config.max_attempts {
        tracing::info!("Attempt {} of {} to fetch sheet data", attempt, config.max_attempts);

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!("Fetch succeeded after {} attempts", attempt);
                }
                return Ok(value);
            }
            Err(e) => {
                tracing::warn!("Attempt {} of {} failed: {}", attempt, config.max_attempts, e);
                last_error = Some(e.to_string());

                if attempt < config.max_attempts {
                    let delay = config.delay_for_attempt(attempt, &mut rand::thread_rng());
                    tracing::info!("Waiting {:.2}s before retry", delay.as_secs_f64());
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    tracing::error!("Max retries reached, could not fetch sheet data");
    Err(FeedError::RetriesExhausted {
        attempts: config.max_attempts,
        last_error: last_error.unwrap_or_else(|| "no attempts were made".to_string()),
    })
}

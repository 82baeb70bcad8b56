//! Jittered exponential backoff shared by every storage write and stream publish.

use std::{fmt, future::Future, time::Duration};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::metrics;

/// Retry settings as they appear in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt. `0` disables retrying.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Fraction of the delay randomized around its midpoint, `0.0..=1.0`.
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 3, base_delay_ms: 100, max_delay_ms: 2_000, jitter_factor: 0.2 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms.max(config.base_delay_ms),
            jitter_factor: config.jitter_factor.clamp(0.0, 1.0),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries.
    #[must_use]
    pub fn none() -> Self {
        Self { max_retries: 0, base_delay_ms: 0, max_delay_ms: 0, jitter_factor: 0.0 }
    }

    /// `max_retries` retries with no delay between attempts.
    #[must_use]
    pub fn immediate(max_retries: u32) -> Self {
        Self { max_retries, ..Self::none() }
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(10);
        let base_delay = self.base_delay_ms.saturating_mul(1u64 << shift);
        let capped_delay = base_delay.min(self.max_delay_ms);

        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let jitter_range = (capped_delay as f64 * self.jitter_factor) as u64;
        let jitter_offset =
            if jitter_range > 0 { rand::rng().random_range(0..jitter_range) } else { 0 };

        Duration::from_millis(capped_delay.saturating_sub(jitter_range / 2) + jitter_offset)
    }

    /// Runs `op` until it succeeds or the retries are exhausted, returning the last error.
    ///
    /// Every failed attempt is counted under `operation` in the transport failure metric.
    ///
    /// # Errors
    ///
    /// Returns the error of the final attempt.
    pub async fn run<T, E, F, Fut>(&self, operation: &'static str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut attempt = 0u32;

        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(operation, attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => {
                    metrics::record_transport_failure(operation);

                    if attempt >= self.max_retries {
                        tracing::warn!(
                            operation,
                            attempts = attempt + 1,
                            error = %e,
                            "operation failed after max retries"
                        );
                        return Err(e);
                    }

                    attempt += 1;
                    let delay = self.delay_for(attempt);
                    tracing::debug!(
                        operation,
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "operation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

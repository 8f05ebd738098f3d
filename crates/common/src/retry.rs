//! Bounded retry with exponential backoff.

use std::{fmt::Display, future::Future, time::Duration};

use serde::Deserialize;
use tracing::*;

/// Retry policy shared by checkpoint sources and chain-data reads.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,

    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,

    /// Multiplier applied for each subsequent retry.
    pub multiplier: f64,

    /// Cap on any single delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 200,
            multiplier: 2.0,
            max_delay_ms: 5_000,
        }
    }
}

impl RetryConfig {
    /// Delay to wait before retry number `retry_count` (zero-based).
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let exp = i32::try_from(retry_count).unwrap_or(i32::MAX);
        let delay = self.base_delay_ms as f64 * self.multiplier.powi(exp);
        Duration::from_millis(delay.min(self.max_delay_ms as f64) as u64)
    }

    pub fn should_retry(&self, retry_count: u32) -> bool {
        retry_count < self.max_retries
    }
}

/// Runs `op` until it succeeds, returns an error `is_retryable` rejects, or the policy is
/// exhausted. Sleeps the backoff delay between attempts.
pub async fn retry_with_backoff<T, E, F, Fut>(
    name: &str,
    config: &RetryConfig,
    is_retryable: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut retry_count = 0;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(err) if is_retryable(&err) && config.should_retry(retry_count) => {
                let delay = config.delay_for(retry_count);
                warn!(%name, %err, retry_count, ?delay, "retrying after error");
                tokio::time::sleep(delay).await;
                retry_count += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

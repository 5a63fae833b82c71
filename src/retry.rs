// src/retry.rs
//! Bounded exponential backoff shared by feed fetches and completion calls.
//!
//! The wrapper only bounds retry duration. It knows nothing about
//! fallbacks; after the last attempt the error propagates to the caller,
//! which owns the degradation path.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            min_delay,
            max_delay,
        }
    }

    /// Delay before the attempt following `attempt` (1-based). Doubles from
    /// `min_delay`, clamped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let ms = self.min_delay.as_millis() as u64;
        let capped = (ms << shift).min(self.max_delay.as_millis() as u64);
        Duration::from_millis(capped)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1), Duration::from_secs(10))
    }
}

/// Run `op` until it succeeds or `policy.max_attempts` is exhausted.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < policy.max_attempts => {
                tracing::warn!(error = ?e, attempt, "transient failure, backing off");
                tokio::time::sleep(policy.delay_for(attempt)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

//! Bounded exponential backoff for transient failures

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::Result;

/// How a status check retries transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Total attempts including the first; 1 disables retrying
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based), with up to 25% jitter
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .initial_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
        let base = exp.min(self.max_delay_ms);
        let jitter = if base >= 4 {
            rand::thread_rng().gen_range(0..=base / 4)
        } else {
            0
        };
        Duration::from_millis(base.saturating_sub(jitter))
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out
    ///
    /// Only errors for which [`crate::Error::is_transient`] holds are retried.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::debug!(
                        what,
                        attempt,
                        max = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

use std::future::Future;
use std::time::Duration;

use log::warn;
use rand::Rng;
use serde::Deserialize;

use crate::error::Transient;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay_ms: 500,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            attempts: 1,
            base_delay_ms: 0,
        }
    }

    /// Delay before retry number `retry` (1-based): base * 2^(retry-1), plus up to 25% jitter.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exp = self.base_delay_ms.saturating_mul(1u64 << (retry.saturating_sub(1)).min(16));
        let jitter = if exp >= 4 {
            rand::thread_rng().gen_range(0..=exp / 4)
        } else {
            0
        };
        Duration::from_millis(exp.saturating_add(jitter))
    }

    /// Runs `op` until it succeeds, fails with a permanent error, or attempts run out.
    pub async fn run<T, E, F, Fut>(&self, what: &str, mut op: F) -> std::result::Result<T, E>
    where
        E: Transient + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts && e.is_transient() => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        what, attempt, attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

//! Retry policy for oracle calls.
//!
//! `BackoffPolicy::decide` is a pure function of the attempt number and the
//! error; `retry_with_backoff` applies it to any async oracle call.

use std::future::Future;
use std::time::Duration;

use crate::error::{OracleError, OracleResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    Stop,
}

/// Exponential backoff on rate-limit responses only: attempt `n` (0-based)
/// waits `base * 2^(n+1)`, and at most `max_attempts` calls are made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_millis(1000) }
    }
}

impl BackoffPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self { max_attempts, base_delay }
    }

    pub fn decide(&self, attempt: u32, error: &OracleError) -> RetryDecision {
        if !error.is_rate_limit() || attempt.saturating_add(1) >= self.max_attempts {
            return RetryDecision::Stop;
        }
        let factor = 1u32 << attempt.saturating_add(1).min(16);
        RetryDecision::RetryAfter(self.base_delay.saturating_mul(factor))
    }
}

pub async fn retry_with_backoff<T, F, Fut>(policy: &BackoffPolicy, mut op: F) -> OracleResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = OracleResult<T>>,
{
    let mut attempt = 0u32;
    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        match policy.decide(attempt, &err) {
            RetryDecision::Stop => return Err(err),
            RetryDecision::RetryAfter(delay) => {
                tracing::warn!(
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "rate limited, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

//! Retry policy for upstream calls
//!
//! Exponential backoff without jitter: attempt `n` waits `2^(n-1)` seconds
//! before attempt `n + 1`. Rate-limited responses wait at least the
//! provider's `Retry-After`.

use std::future::Future;
use std::time::Duration;

use crate::utils::logging::*;
use crate::utils::{ConnectorError, ConnectorResult};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration },
    Stop,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

/// Transient failures worth another attempt.
pub fn is_retryable(error: &ConnectorError) -> bool {
    matches!(
        error,
        ConnectorError::Network(_)
            | ConnectorError::RateLimited { .. }
            | ConnectorError::UpstreamUnavailable(_)
    )
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_secs(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decides what to do after `attempt` (1-based) failed with `error`.
    pub fn decide(&self, attempt: u32, error: &ConnectorError) -> RetryDecision {
        if attempt >= self.max_attempts || !is_retryable(error) {
            return RetryDecision::Stop;
        }

        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        let backoff = self.base_delay.saturating_mul(factor);

        let delay = match error {
            ConnectorError::RateLimited { retry_after: Some(wait) } => backoff.max(*wait),
            _ => backoff,
        };

        RetryDecision::Retry { delay }
    }

    /// Runs `op` until it succeeds or the policy says stop.
    ///
    /// `op` receives the 1-based attempt number; every call is an
    /// independent attempt. The last error is returned on stop.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> ConnectorResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = ConnectorResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => match self.decide(attempt, &error) {
                    RetryDecision::Retry { delay } => {
                        log_retry_scheduled(operation, attempt, error.kind(), delay);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    RetryDecision::Stop => {
                        log_retry_exhausted(operation, attempt, &error.to_string());
                        return Err(error);
                    }
                },
            }
        }
    }
}

//! Chunk retry policy.

use std::time::Duration;

use super::RetryConfig;
use crate::sink::SinkError;

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff: `initial * 2^(retry - 1)` for each retry of the same chunk.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
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
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
        }
    }
}

impl RetryPolicy {
    /// Decide what to do after `failed_attempts` consecutive failures of one chunk.
    ///
    /// `failed_attempts` is 1-based: 1 means the first attempt just failed.
    pub fn decide(&self, failed_attempts: u32, error: &SinkError) -> RetryDecision {
        if !error.is_transient() || failed_attempts > self.max_retries {
            return RetryDecision::NoRetry;
        }
        let exp = 1u32 << failed_attempts.saturating_sub(1).min(16);
        RetryDecision::RetryAfter(self.initial_backoff.saturating_mul(exp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backoff_sequence() {
        let policy = RetryPolicy::default();
        let err = SinkError::Timeout;
        assert_eq!(
            policy.decide(1, &err),
            RetryDecision::RetryAfter(Duration::from_secs(5))
        );
        assert_eq!(
            policy.decide(2, &err),
            RetryDecision::RetryAfter(Duration::from_secs(10))
        );
        assert_eq!(
            policy.decide(3, &err),
            RetryDecision::RetryAfter(Duration::from_secs(20))
        );
        // Fourth failure exhausts the three retries
        assert_eq!(policy.decide(4, &err), RetryDecision::NoRetry);
    }

    #[test]
    fn test_fatal_errors_are_not_retried() {
        let policy = RetryPolicy::default();
        let err = SinkError::Unauthorized("expired".into());
        assert_eq!(policy.decide(1, &err), RetryDecision::NoRetry);
    }

    #[test]
    fn test_zero_retries() {
        let policy = RetryPolicy {
            max_retries: 0,
            initial_backoff: Duration::from_millis(1),
        };
        assert_eq!(policy.decide(1, &SinkError::Timeout), RetryDecision::NoRetry);
    }
}

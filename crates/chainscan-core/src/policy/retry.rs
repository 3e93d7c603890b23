//! Classified fixed-delay retry against a single endpoint.

use std::future::Future;
use std::time::Duration;

use crate::error::TransportError;
use crate::policy::classify::{ErrorClass, ErrorClassifier};

/// Configuration for the retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not counting the first try).
    pub max_retries: u32,
    /// Delay before retrying a generic failure.
    pub generic_delay: Duration,
    /// Delay before retrying a rate-limited failure.
    pub rate_limit_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            generic_delay: Duration::from_millis(500),
            rate_limit_delay: Duration::from_millis(2000),
        }
    }
}

/// Stateless retry policy: runs an operation up to `max_retries + 1` times,
/// sleeping a class-dependent delay between attempts.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    pub config: RetryConfig,
    classifier: ErrorClassifier,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig, classifier: ErrorClassifier) -> Self {
        Self { config, classifier }
    }

    /// Total number of attempts per endpoint.
    pub fn max_attempts(&self) -> u32 {
        self.config.max_retries.saturating_add(1)
    }

    /// Returns the delay to sleep before retrying after `err`.
    pub fn delay_for(&self, err: &TransportError) -> (ErrorClass, Duration) {
        let class = self.classifier.classify(err);
        let delay = match class {
            ErrorClass::RateLimit => self.config.rate_limit_delay,
            ErrorClass::Generic => self.config.generic_delay,
        };
        (class, delay)
    }

    /// Run `op` until it succeeds or the attempt budget is spent.
    ///
    /// The last error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, TransportError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };
            if attempt >= max_attempts {
                tracing::warn!(label, attempt, error = %err, "retries exhausted");
                return Err(err);
            }
            let (class, delay) = self.delay_for(&err);
            tracing::warn!(
                label,
                attempt,
                class = %class,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying request"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

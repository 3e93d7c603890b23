//! Rate-limit vs generic error classification.
//!
//! Structured signals win: an HTTP status or JSON-RPC error code listed in
//! the config marks the error as a rate limit. Substring matching on the
//! error text is the fallback for providers that only say so in prose.

use crate::error::TransportError;

/// How a failed call should be backed off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Provider throttling or quota exhaustion: use the long delay.
    RateLimit,
    /// Anything else: use the short delay.
    Generic,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "rate-limit"),
            Self::Generic => write!(f, "generic"),
        }
    }
}

/// Configuration for the error classifier.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// HTTP statuses treated as throttling.
    pub rate_limit_statuses: Vec<u16>,
    /// JSON-RPC error codes treated as throttling.
    pub rate_limit_codes: Vec<i64>,
    /// Lower-case substrings that mark an error message as throttling.
    pub rate_limit_needles: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rate_limit_statuses: vec![429],
            // -32005 is also what some providers return for "query returned
            // more than 10000 results". Such a range error then gets the
            // rate-limit backoff and is retried on the same range until the
            // endpoint is abandoned; keep chunks small enough to avoid it.
            rate_limit_codes: vec![-32005],
            rate_limit_needles: [
                "rate limit",
                "ratelimit",
                "rate-limit",
                "too many requests",
                "quota",
                "throttl",
                "limit exceeded",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Stateless classifier mapping a [`TransportError`] to an [`ErrorClass`].
#[derive(Debug, Clone, Default)]
pub struct ErrorClassifier {
    config: ClassifierConfig,
}

impl ErrorClassifier {
    pub fn new(mut config: ClassifierConfig) -> Self {
        for needle in &mut config.rate_limit_needles {
            *needle = needle.to_lowercase();
        }
        config.rate_limit_needles.retain(|n| !n.is_empty());
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn classify(&self, err: &TransportError) -> ErrorClass {
        if let Some(status) = err.status() {
            if self.config.rate_limit_statuses.contains(&status) {
                return ErrorClass::RateLimit;
            }
        }
        if let Some(code) = err.rpc_code() {
            if self.config.rate_limit_codes.contains(&code) {
                return ErrorClass::RateLimit;
            }
        }
        let text = err.to_string().to_lowercase();
        if self
            .config
            .rate_limit_needles
            .iter()
            .any(|needle| text.contains(needle.as_str()))
        {
            return ErrorClass::RateLimit;
        }
        ErrorClass::Generic
    }
}

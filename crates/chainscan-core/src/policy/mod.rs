//! Retry policy and error classification.
//!
//! ```text
//! failure → [ErrorClassifier] → RateLimit | Generic → [RetryPolicy] delay → retry
//! ```

pub mod classify;
pub mod retry;

pub use classify::{ClassifierConfig, ErrorClass, ErrorClassifier};
pub use retry::{RetryConfig, RetryPolicy};

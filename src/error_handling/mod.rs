//! Error handling and retry classification.
//!
//! This module provides:
//! - The failure taxonomy (`ErrorKind`) and the `ClassifiedError` carried by every component
//! - Categorization of library errors into that taxonomy
//! - The retry classifier consumed by the durable step runtime
//! - Failure statistics
//!
//! Failures fall into two buckets:
//! - **Fatal**: will not fix itself on retry (invalid certificate, unsupported TLD, SSRF rejection)
//! - **Retryable**: transient, retried after a delay (timeouts, connection failures, rate limits)

mod categorization;
mod classifier;
mod stats;
mod types;

// Re-export public API
pub use categorization::{
    categorize_io_error, categorize_message, categorize_reqwest_error, categorize_rustls_error,
};
pub use classifier::{backoff_for_attempt, classify, get_retry_strategy, is_transient, RetryDecision};
pub use stats::FailureStats;
pub use types::{ClassifiedError, ErrorKind, InitializationError, StoreError};

//! Retry classification.
//!
//! The classifier is the only place that decides retry policy. Fetchers
//! produce typed failures; the durable step runtime consumes the
//! [`RetryDecision`] produced here and owns the actual retry loop.

use std::time::Duration;

use serde::Serialize;
use tokio_retry::strategy::ExponentialBackoff;

use super::types::{ClassifiedError, ErrorKind};
use crate::config::{
    MAX_RETRY_WINDOW, RETRY_BACKOFF_BASE, RETRY_BACKOFF_FACTOR_MS, RETRY_MAX_DELAY_SECS,
};

/// What the step runtime should do with a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetryDecision {
    /// Give up permanently.
    Fatal,
    /// Schedule another attempt after `retry_after`.
    Retryable {
        #[serde(rename = "retry_after_ms", serialize_with = "as_millis")]
        retry_after: Duration,
    },
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl RetryDecision {
    pub fn is_fatal(&self) -> bool {
        matches!(self, RetryDecision::Fatal)
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            RetryDecision::Fatal => None,
            RetryDecision::Retryable { retry_after } => Some(*retry_after),
        }
    }
}

/// Creates the exponential backoff used when a failure carries no delay of its own.
///
/// Delays are 1s, 2s, 4s, ... capped at `RETRY_MAX_DELAY_SECS`.
pub fn get_retry_strategy() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(RETRY_BACKOFF_BASE)
        .factor(RETRY_BACKOFF_FACTOR_MS)
        .max_delay(Duration::from_secs(RETRY_MAX_DELAY_SECS))
}

/// Backoff delay for a zero-based attempt number.
pub fn backoff_for_attempt(attempt: u32) -> Duration {
    get_retry_strategy()
        .nth(attempt as usize)
        .unwrap_or(Duration::from_secs(RETRY_MAX_DELAY_SECS))
}

/// Whether a failure kind can succeed on a later attempt.
///
/// Guard rejections for non-public addresses and certificate validation
/// failures are permanent. Resolution failures and transport problems are
/// transient, including the case where every DoH provider failed: a domain
/// that does not resolve today may resolve tomorrow.
pub fn is_transient(kind: ErrorKind) -> bool {
    match kind {
        ErrorKind::Timeout
        | ErrorKind::FetchError
        | ErrorKind::DnsError
        | ErrorKind::RateLimited
        | ErrorKind::Storage => true,
        ErrorKind::InvalidUrl
        | ErrorKind::ProtocolNotAllowed
        | ErrorKind::HostNotAllowed
        | ErrorKind::HostBlocked
        | ErrorKind::PrivateIp
        | ErrorKind::RedirectLimit
        | ErrorKind::InvalidResponse
        | ErrorKind::SizeExceeded
        | ErrorKind::TlsError
        | ErrorKind::UnsupportedTld
        | ErrorKind::QuotaExhausted
        | ErrorKind::Rejected => false,
    }
}

/// Classifies a failed attempt.
///
/// # Arguments
///
/// * `error` - The failure produced by a fetcher
/// * `attempt` - Zero-based attempt number, used for the default backoff
pub fn classify(error: &ClassifiedError, attempt: u32) -> RetryDecision {
    let decision = decide(error, attempt);
    log::debug!(
        "Classified {} (attempt {}) as {:?}",
        error.kind,
        attempt,
        decision
    );
    decision
}

fn decide(error: &ClassifiedError, attempt: u32) -> RetryDecision {
    if !is_transient(error.kind) {
        return RetryDecision::Fatal;
    }
    match error.retry_after {
        // A signal that will not clear within the retry window is not worth holding a step for.
        Some(delay) if delay > MAX_RETRY_WINDOW => RetryDecision::Fatal,
        Some(delay) => RetryDecision::Retryable { retry_after: delay },
        None => RetryDecision::Retryable {
            retry_after: backoff_for_attempt(attempt),
        },
    }
}

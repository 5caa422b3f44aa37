//! Registration data structures.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error_handling::{ClassifiedError, ErrorKind};

/// Registration facts for one domain, superseded wholesale by the next lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistrationRecord {
    pub domain: String,
    pub registrar: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub updated_date: Option<DateTime<Utc>>,
    /// Lowercase, without trailing dot
    pub nameservers: Vec<String>,
    /// RDAP status values as published (e.g. "client transfer prohibited")
    pub status: Vec<String>,
    pub transfer_locked: bool,
    /// RDAP URL the record was read from
    pub source: String,
    /// Raw RDAP response, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

/// Outcome of a successful lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LookupOutcome {
    Registered { record: RegistrationRecord },
    /// The registry answered that the name does not exist
    Unregistered { domain: String },
}

/// Why a lookup failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WhoisFailure {
    /// No RDAP service for the TLD, or the registry does not publish data. Permanent.
    UnsupportedTld,
    Timeout,
    /// A registry redirect the host guard refused, or a broken redirect chain
    Refused,
    /// Anything else; transient
    Retry,
}

impl WhoisFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            WhoisFailure::UnsupportedTld => "unsupported_tld",
            WhoisFailure::Timeout => "timeout",
            WhoisFailure::Refused => "refused",
            WhoisFailure::Retry => "retry",
        }
    }
}

/// A failed lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}: {message}", .failure.as_str())]
pub struct WhoisError {
    pub failure: WhoisFailure,
    pub message: String,
    /// Delay requested by the registry (HTTP 429 `Retry-After`)
    pub retry_after: Option<Duration>,
    /// Guard or redirect error behind a `Refused` failure
    pub kind: Option<ErrorKind>,
}

impl WhoisError {
    pub fn new(failure: WhoisFailure, message: impl Into<String>) -> Self {
        Self {
            failure,
            message: message.into(),
            retry_after: None,
            kind: None,
        }
    }

    /// Wraps a guard rejection or redirect failure, keeping its kind.
    pub fn refused(error: ClassifiedError) -> Self {
        Self {
            failure: WhoisFailure::Refused,
            message: error.message,
            retry_after: None,
            kind: Some(error.kind),
        }
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }
}

impl From<WhoisError> for ClassifiedError {
    fn from(err: WhoisError) -> Self {
        let kind = match (err.failure, err.retry_after) {
            (WhoisFailure::UnsupportedTld, _) => ErrorKind::UnsupportedTld,
            (WhoisFailure::Timeout, _) => ErrorKind::Timeout,
            (WhoisFailure::Refused, _) => err.kind.unwrap_or(ErrorKind::InvalidResponse),
            (WhoisFailure::Retry, Some(_)) => ErrorKind::RateLimited,
            (WhoisFailure::Retry, None) => ErrorKind::FetchError,
        };
        let classified = ClassifiedError::new(kind, err.message);
        match err.retry_after {
            Some(delay) => classified.with_retry_after(delay),
            None => classified,
        }
    }
}

/// Wire shape of a lookup: `{success: true, ...}` or `{success: false, error}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupReport {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: Option<LookupOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<WhoisFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<Result<LookupOutcome, WhoisError>> for LookupReport {
    fn from(result: Result<LookupOutcome, WhoisError>) -> Self {
        match result {
            Ok(outcome) => Self {
                success: true,
                outcome: Some(outcome),
                error: None,
                message: None,
            },
            Err(e) => Self {
                success: false,
                outcome: None,
                error: Some(e.failure),
                message: Some(e.message),
            },
        }
    }
}

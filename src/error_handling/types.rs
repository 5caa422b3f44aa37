//! Error type definitions.
//!
//! This module defines the failure taxonomy shared by every acquisition
//! component, plus the errors raised while setting the engine up.

use std::time::Duration;

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use serde::{Serialize, Serializer};
use strum_macros::{AsRefStr, EnumIter as EnumIterMacro};
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing an HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Error raised by the persistence collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The domain id is not known to the store.
    #[error("unknown domain id {0}")]
    UnknownDomain(u64),

    /// The backing store refused or failed the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Kind of failure, independent of which component produced it.
///
/// The string form (`as_ref()`) is the stable wire name exposed to
/// collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    // URL and host validation
    InvalidUrl,
    ProtocolNotAllowed,
    HostNotAllowed,
    HostBlocked,
    DnsError,
    PrivateIp,
    // Transfer limits and protocol violations
    RedirectLimit,
    InvalidResponse,
    SizeExceeded,
    // Transport
    Timeout,
    TlsError,
    FetchError,
    // Registration data
    UnsupportedTld,
    // Collaborator signals
    RateLimited,
    QuotaExhausted,
    Rejected,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidUrl => "invalid_url",
            ErrorKind::ProtocolNotAllowed => "protocol_not_allowed",
            ErrorKind::HostNotAllowed => "host_not_allowed",
            ErrorKind::HostBlocked => "host_blocked",
            ErrorKind::DnsError => "dns_error",
            ErrorKind::PrivateIp => "private_ip",
            ErrorKind::RedirectLimit => "redirect_limit",
            ErrorKind::InvalidResponse => "invalid_response",
            ErrorKind::SizeExceeded => "size_exceeded",
            ErrorKind::Timeout => "timeout",
            ErrorKind::TlsError => "tls_error",
            ErrorKind::FetchError => "fetch_error",
            ErrorKind::UnsupportedTld => "unsupported_tld",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::QuotaExhausted => "quota_exhausted",
            ErrorKind::Rejected => "rejected",
            ErrorKind::Storage => "storage",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A failure tagged with its kind, produced once per attempt and never persisted.
///
/// Serializes to `{kind, message, retry_after_ms?, status?}`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{kind}: {message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(
        rename = "retry_after_ms",
        serialize_with = "serialize_duration_ms",
        skip_serializing_if = "Option::is_none"
    )]
    pub retry_after: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

fn serialize_duration_ms<S: Serializer>(
    value: &Option<Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(d) => serializer.serialize_u64(d.as_millis() as u64),
        None => serializer.serialize_none(),
    }
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
            status: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl From<StoreError> for ClassifiedError {
    fn from(e: StoreError) -> Self {
        ClassifiedError::new(ErrorKind::Storage, e.to_string())
    }
}

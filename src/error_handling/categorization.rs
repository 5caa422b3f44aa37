//! Error categorization.
//!
//! Maps errors from the underlying libraries (`reqwest`, `std::io`, `rustls`)
//! onto an [`ErrorKind`]. Structured error types are inspected first; message
//! substring matching is only a last resort for errors that arrive as opaque
//! strings (for example resolver failures wrapped by hyper). That fallback is a
//! known limitation: a library rewording its messages silently moves an error
//! into the generic `fetch_error` bucket.

use std::error::Error as StdError;
use std::io;

use super::types::{ClassifiedError, ErrorKind};

/// Message fragments that indicate a name-resolution failure.
const DNS_FAILURE_SIGNATURES: &[&str] = &[
    "enotfound",
    "eai_again",
    "failed to lookup address",
    "name or service not known",
    "no such host",
    "nodename nor servname",
    "temporary failure in name resolution",
];

/// Message fragments that indicate a certificate validation failure.
const CERTIFICATE_FAILURE_SIGNATURES: &[&str] = &[
    "invalid peer certificate",
    "unable to verify the first certificate",
    "certificate has expired",
    "self signed certificate",
    "self-signed certificate",
    "unknownissuer",
    "notvalidforname",
];

/// Walks an error's `source()` chain.
fn chain<'a>(
    error: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(error), |&e| e.source())
}

/// Categorizes a `reqwest::Error` raised while sending a request or reading a body.
///
/// A [`ClassifiedError`] found anywhere in the chain (the safe resolver raises
/// one when it refuses an address) wins over reqwest's own flags.
pub fn categorize_reqwest_error(error: &reqwest::Error) -> ClassifiedError {
    for cause in chain(error) {
        if let Some(classified) = cause.downcast_ref::<ClassifiedError>() {
            return classified.clone();
        }
    }

    let kind = if error.is_timeout() {
        ErrorKind::Timeout
    } else if error.is_builder() {
        ErrorKind::InvalidUrl
    } else if error.is_redirect() {
        ErrorKind::RedirectLimit
    } else if let Some(kind) = chain(error).find_map(kind_from_cause) {
        kind
    } else {
        ErrorKind::FetchError
    };

    let mut classified = ClassifiedError::new(kind, error.to_string());
    if let Some(status) = error.status() {
        classified = classified.with_status(status.as_u16());
    }
    classified
}

/// Categorizes an `std::io::Error` raised by a raw TCP/TLS socket.
pub fn categorize_io_error(error: &io::Error) -> ErrorKind {
    if error.kind() == io::ErrorKind::TimedOut {
        return ErrorKind::Timeout;
    }
    if let Some(inner) = error.get_ref() {
        if let Some(tls) = inner.downcast_ref::<rustls::Error>() {
            return categorize_rustls_error(tls);
        }
    }
    match error.kind() {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::AddrNotAvailable
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof => ErrorKind::FetchError,
        _ => categorize_message(&error.to_string()).unwrap_or(ErrorKind::FetchError),
    }
}

/// Every rustls failure happens during or after the handshake, so it is a TLS problem.
pub fn categorize_rustls_error(_error: &rustls::Error) -> ErrorKind {
    ErrorKind::TlsError
}

fn kind_from_cause(cause: &(dyn StdError + 'static)) -> Option<ErrorKind> {
    if let Some(tls) = cause.downcast_ref::<rustls::Error>() {
        return Some(categorize_rustls_error(tls));
    }
    if let Some(io_err) = cause.downcast_ref::<io::Error>() {
        if io_err.kind() == io::ErrorKind::TimedOut {
            return Some(ErrorKind::Timeout);
        }
        if let Some(inner) = io_err.get_ref() {
            if let Some(tls) = inner.downcast_ref::<rustls::Error>() {
                return Some(categorize_rustls_error(tls));
            }
        }
    }
    categorize_message(&cause.to_string())
}

/// Last-resort categorization from an error message.
pub fn categorize_message(message: &str) -> Option<ErrorKind> {
    let lower = message.to_lowercase();
    if DNS_FAILURE_SIGNATURES.iter().any(|sig| lower.contains(sig)) {
        return Some(ErrorKind::DnsError);
    }
    if CERTIFICATE_FAILURE_SIGNATURES
        .iter()
        .any(|sig| lower.contains(sig))
    {
        return Some(ErrorKind::TlsError);
    }
    None
}

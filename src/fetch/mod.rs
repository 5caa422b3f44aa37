//! Remote asset fetching.
//!
//! A single logical HTTP(S) fetch against an untrusted host:
//! - Redirects are followed manually and the guard re-runs on every hop
//! - The body is streamed under a byte ceiling (truncate or fail)
//! - HEAD can fall back to GET once when the server answers 405
//!
//! HTTP error statuses are results, not errors. Only transport, guard and
//! size failures are returned as `ClassifiedError`. A TLS negotiation failure
//! here is a transport failure (`fetch_error`, retryable); `tls_error` is
//! reserved for the certificate chain walker.

mod body;
mod redirects;
mod types;

use std::sync::Arc;

use log::{debug, warn};
use url::Url;

use crate::config::{HTTP_STATUS_METHOD_NOT_ALLOWED, MAX_HEADERS_PER_RESPONSE, MAX_HEADER_VALUE_LENGTH};
use crate::error_handling::{categorize_reqwest_error, ClassifiedError, ErrorKind};
use crate::security::{parse_target, UrlGuard};

// Re-export public API
pub use body::{read_body_limited, LimitedBody};
pub use redirects::{is_redirect_status, resolve_location};
pub use types::{FetchMethod, FetchOptions, FetchResponse, HttpHeader, RedirectHop};

/// SSRF-hardened fetcher.
///
/// The client must have transport-level redirects disabled (see
/// `initialization::init_guarded_client`); a client that follows redirects
/// itself would bypass the per-hop guard.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    guard: Arc<dyn UrlGuard>,
}

impl Fetcher {
    pub fn new(client: reqwest::Client, guard: Arc<dyn UrlGuard>) -> Self {
        Self { client, guard }
    }

    /// Fetches `url` according to `options`.
    ///
    /// # Errors
    ///
    /// Guard rejections (`invalid_url`, `protocol_not_allowed`,
    /// `host_blocked`, `host_not_allowed`, `dns_error`, `private_ip`),
    /// `redirect_limit`, `invalid_response`, `size_exceeded`, and transport
    /// failures (`timeout`, `fetch_error`).
    pub async fn fetch(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<FetchResponse, ClassifiedError> {
        let start = parse_target(url)?;
        let response = self.fetch_with_method(&start, options.method, options).await?;

        if options.method == FetchMethod::Head
            && options.head_fallback
            && response.status == HTTP_STATUS_METHOD_NOT_ALLOWED
        {
            debug!("HEAD {} answered 405, retrying with GET", url);
            return self.fetch_with_method(&start, FetchMethod::Get, options).await;
        }

        Ok(response)
    }

    async fn fetch_with_method(
        &self,
        start: &Url,
        method: FetchMethod,
        options: &FetchOptions,
    ) -> Result<FetchResponse, ClassifiedError> {
        let mut current = start.clone();
        let mut hops: Vec<RedirectHop> = Vec::new();

        loop {
            self.guard.ensure_allowed(&current, &options.guard).await?;

            let response = self
                .client
                .request(method.into(), current.clone())
                .send()
                .await
                .map_err(|e| transport_failure(categorize_reqwest_error(&e)))?;

            let status = response.status().as_u16();
            if !is_redirect_status(status) {
                return self.finish(response, method, hops, options).await;
            }

            if hops.len() >= options.max_redirects {
                warn!(
                    "Redirect limit ({}) exceeded for {}",
                    options.max_redirects, start
                );
                return Err(ClassifiedError::new(
                    ErrorKind::RedirectLimit,
                    format!(
                        "more than {} redirects starting at {}",
                        options.max_redirects, start
                    ),
                )
                .with_status(status));
            }

            let next = resolve_location(&current, response.headers())?;
            // Release the connection before following the next hop.
            drop(response);

            debug!("Redirect {} {} -> {}", status, current, next);
            hops.push(RedirectHop {
                index: hops.len() + 1,
                url: next.to_string(),
                status,
            });
            current = next;
        }
    }

    async fn finish(
        &self,
        response: reqwest::Response,
        method: FetchMethod,
        redirects: Vec<RedirectHop>,
        options: &FetchOptions,
    ) -> Result<FetchResponse, ClassifiedError> {
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = capture_headers(response.headers());
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = match method {
            FetchMethod::Head => LimitedBody::default(),
            FetchMethod::Get => {
                read_body_limited(response, options.max_bytes, options.allow_truncation).await?
            }
        };

        Ok(FetchResponse {
            body: body.bytes,
            content_type,
            final_url,
            status,
            headers,
            redirects,
            method,
            truncated: body.truncated,
        })
    }
}

/// Reports a failed HTTP-layer TLS negotiation as a retryable transport failure.
fn transport_failure(error: ClassifiedError) -> ClassifiedError {
    if error.is(ErrorKind::TlsError) {
        ClassifiedError {
            kind: ErrorKind::FetchError,
            ..error
        }
    } else {
        error
    }
}

/// Copies response headers, bounding both count and value length.
fn capture_headers(headers: &reqwest::header::HeaderMap) -> Vec<HttpHeader> {
    headers
        .iter()
        .take(MAX_HEADERS_PER_RESPONSE)
        .map(|(name, value)| {
            let value = String::from_utf8_lossy(value.as_bytes());
            let value: String = value.chars().take(MAX_HEADER_VALUE_LENGTH).collect();
            HttpHeader {
                name: name.as_str().to_string(),
                value,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn test_capture_headers_caps_value_length() {
        let mut map = HeaderMap::new();
        let long = "a".repeat(MAX_HEADER_VALUE_LENGTH + 50);
        map.insert("x-long", HeaderValue::from_str(&long).unwrap());
        map.insert("server", HeaderValue::from_static("nginx"));

        let captured = capture_headers(&map);
        assert_eq!(captured.len(), 2);
        let long_header = captured.iter().find(|h| h.name == "x-long").unwrap();
        assert_eq!(long_header.value.len(), MAX_HEADER_VALUE_LENGTH);
    }

    #[test]
    fn test_capture_headers_caps_count() {
        let mut map = HeaderMap::new();
        for i in 0..(MAX_HEADERS_PER_RESPONSE + 20) {
            let name = reqwest::header::HeaderName::from_bytes(format!("x-h{i}").as_bytes()).unwrap();
            map.insert(name, HeaderValue::from_static("v"));
        }
        assert_eq!(capture_headers(&map).len(), MAX_HEADERS_PER_RESPONSE);
    }

    #[test]
    fn test_tls_negotiation_failure_is_retryable_fetch_error() {
        let err = transport_failure(ClassifiedError::new(
            ErrorKind::TlsError,
            "invalid peer certificate: UnknownIssuer",
        ));
        assert_eq!(err.kind, ErrorKind::FetchError);
        assert!(err.message.contains("UnknownIssuer"));
        assert!(!crate::error_handling::classify(&err, 0).is_fatal());
    }

    #[test]
    fn test_transport_failure_keeps_other_kinds() {
        let err = transport_failure(ClassifiedError::new(ErrorKind::PrivateIp, "10.0.0.1"));
        assert_eq!(err.kind, ErrorKind::PrivateIp);
        let err = transport_failure(ClassifiedError::new(ErrorKind::Timeout, "deadline"));
        assert_eq!(err.kind, ErrorKind::Timeout);
    }

    #[test]
    fn test_fetch_options_head_defaults() {
        let options = FetchOptions::head();
        assert_eq!(options.method, FetchMethod::Head);
        assert!(options.head_fallback);
        assert_eq!(options.max_redirects, crate::config::DEFAULT_MAX_REDIRECTS);
        assert!(!options.allow_truncation);
    }
}

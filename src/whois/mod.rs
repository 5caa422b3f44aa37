//! Registration data lookup over RDAP.
//!
//! This module resolves the registry RDAP service for a domain's TLD through
//! the IANA bootstrap file (cached for a week) and queries it:
//! - No service for the TLD, HTTP 501, or a "not published" error body: `unsupported_tld` (permanent)
//! - Request deadline exceeded: `timeout`
//! - HTTP 404: a successful `unregistered` outcome
//! - A redirect the host guard refuses, or too many redirects: `refused`
//! - Everything else, including 429 with its `Retry-After`: `retry`
//!
//! Registry redirects are followed by hand and every hop passes the host
//! guard, the same way the fetcher treats user-derived URLs.

mod bootstrap;
mod parse;
mod types;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use reqwest::header::{HeaderMap, ACCEPT, RETRY_AFTER};
use url::Url;

use crate::config::{
    EngineConfig, BOOTSTRAP_TTL, DEFAULT_MAX_REDIRECTS, HTTP_STATUS_NOT_FOUND, HTTP_STATUS_NOT_IMPLEMENTED,
    HTTP_STATUS_TOO_MANY_REQUESTS, RDAP_MAX_BODY_BYTES, RDAP_TIMEOUT_MS,
};
use crate::domain::registrable_tld;
use crate::error_handling::{categorize_reqwest_error, ClassifiedError, ErrorKind};
use crate::fetch::{is_redirect_status, read_body_limited, resolve_location};
use crate::security::{GuardPolicy, UrlGuard};

// Re-export public API
pub use bootstrap::{Bootstrap, BootstrapCache};
pub use types::{LookupOutcome, LookupReport, RegistrationRecord, WhoisError, WhoisFailure};

use parse::parse_rdap_domain;

/// Error text signatures meaning the registry will never answer for this TLD.
const UNSUPPORTED_SIGNATURES: &[&str] = &[
    "not publicly published",
    "no rdap server",
    "no whois server",
    "not supported",
    "unsupported tld",
];

/// Error text signatures meaning the request ran out of time.
const TIMEOUT_SIGNATURES: &[&str] = &["timed out", "timeout", "etimedout", "deadline"];

/// Options for a single lookup.
#[derive(Debug, Clone)]
pub struct LookupOptions {
    pub timeout: Duration,
    /// Keep the raw RDAP JSON on the record
    pub include_raw: bool,
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(RDAP_TIMEOUT_MS),
            include_raw: false,
        }
    }
}

/// RDAP client backed by a shared bootstrap cache.
///
/// The HTTP client must not follow redirects itself (see
/// `initialization::init_rdap_client`).
#[derive(Clone)]
pub struct RdapClient {
    client: reqwest::Client,
    bootstrap: Arc<BootstrapCache>,
    guard: Arc<dyn UrlGuard>,
    guard_policy: GuardPolicy,
    max_redirects: usize,
}

impl RdapClient {
    pub fn new(
        client: reqwest::Client,
        bootstrap: Arc<BootstrapCache>,
        guard: Arc<dyn UrlGuard>,
    ) -> Self {
        Self {
            client,
            bootstrap,
            guard,
            guard_policy: GuardPolicy::default(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }

    /// Builds a client whose bootstrap comes from `config.rdap_bootstrap_url`.
    pub fn from_config(
        client: reqwest::Client,
        guard: Arc<dyn UrlGuard>,
        config: &EngineConfig,
    ) -> Self {
        let bootstrap = BootstrapCache::new(
            client.clone(),
            config.rdap_bootstrap_url.clone(),
            BOOTSTRAP_TTL,
            config.bootstrap_timeout,
        );
        Self::new(client, Arc::new(bootstrap), guard).max_redirects(config.max_redirects)
    }

    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Looks up the registration record for `domain`.
    ///
    /// # Errors
    ///
    /// A [`WhoisError`] classified `unsupported_tld`, `timeout`, `refused` or `retry`.
    pub async fn lookup(
        &self,
        domain: &str,
        options: &LookupOptions,
    ) -> Result<LookupOutcome, WhoisError> {
        let domain = domain.trim_end_matches('.').to_lowercase();
        let tld = registrable_tld(&domain);

        let bootstrap = self.bootstrap.get().await.ok_or_else(|| {
            WhoisError::new(WhoisFailure::Retry, "RDAP bootstrap data unavailable")
        })?;
        let servers = bootstrap.servers_for(tld).ok_or_else(|| {
            WhoisError::new(
                WhoisFailure::UnsupportedTld,
                format!("no RDAP server for .{tld}"),
            )
        })?;
        let base = servers.first().ok_or_else(|| {
            WhoisError::new(
                WhoisFailure::UnsupportedTld,
                format!("no RDAP server for .{tld}"),
            )
        })?;

        let url = format!("{}/domain/{}", base.trim_end_matches('/'), domain);
        debug!("RDAP lookup {}", url);
        self.query(&domain, &url, options).await
    }

    /// Sends the query, following redirects by hand so each hop passes the guard.
    async fn send(
        &self,
        start: &Url,
        options: &LookupOptions,
    ) -> Result<reqwest::Response, WhoisError> {
        let mut current = start.clone();
        let mut hops = 0;

        loop {
            let response = self
                .client
                .get(current.clone())
                .timeout(options.timeout)
                .header(ACCEPT, "application/rdap+json")
                .send()
                .await
                .map_err(|e| transport_failure(&e))?;

            let status = response.status().as_u16();
            if !is_redirect_status(status) {
                return Ok(response);
            }
            if hops >= self.max_redirects {
                return Err(WhoisError::refused(
                    ClassifiedError::new(
                        ErrorKind::RedirectLimit,
                        format!("more than {} redirects starting at {start}", self.max_redirects),
                    )
                    .with_status(status),
                ));
            }

            let next = resolve_location(&current, response.headers()).map_err(WhoisError::refused)?;
            drop(response);
            if let Err(e) = self.guard.ensure_allowed(&next, &self.guard_policy).await {
                warn!("RDAP redirect {} -> {} refused: {}", current, next, e);
                return Err(WhoisError::refused(e));
            }

            debug!("RDAP redirect {} {} -> {}", status, current, next);
            hops += 1;
            current = next;
        }
    }

    async fn query(
        &self,
        domain: &str,
        url: &str,
        options: &LookupOptions,
    ) -> Result<LookupOutcome, WhoisError> {
        let start = Url::parse(url).map_err(|e| {
            WhoisError::new(WhoisFailure::Retry, format!("bad RDAP URL {url}: {e}"))
        })?;
        let response = self.send(&start, options).await?;
        let source = response.url().to_string();

        let status = response.status().as_u16();
        match status {
            HTTP_STATUS_NOT_FOUND => {
                return Ok(LookupOutcome::Unregistered {
                    domain: domain.to_string(),
                })
            }
            HTTP_STATUS_TOO_MANY_REQUESTS => {
                let err = WhoisError::new(WhoisFailure::Retry, format!("{source} rate limited"));
                return Err(match parse_retry_after(response.headers(), Utc::now()) {
                    Some(delay) => err.with_retry_after(delay),
                    None => err,
                });
            }
            HTTP_STATUS_NOT_IMPLEMENTED => {
                return Err(WhoisError::new(
                    WhoisFailure::UnsupportedTld,
                    format!("{source} does not implement domain lookups"),
                ))
            }
            _ => {}
        }

        let body = read_body_limited(response, RDAP_MAX_BODY_BYTES, false)
            .await
            .map_err(|e| {
                let failure = if e.is(ErrorKind::Timeout) {
                    WhoisFailure::Timeout
                } else {
                    WhoisFailure::Retry
                };
                WhoisError::new(failure, e.message)
            })?;

        if !(200..300).contains(&status) {
            let text = String::from_utf8_lossy(&body.bytes);
            warn!("RDAP {} answered HTTP {}", source, status);
            let failure = failure_from_message(&text);
            return Err(WhoisError::new(
                failure,
                format!("{source} answered HTTP {status}"),
            ));
        }

        let json: serde_json::Value = serde_json::from_slice(&body.bytes).map_err(|e| {
            WhoisError::new(WhoisFailure::Retry, format!("malformed RDAP response: {e}"))
        })?;

        Ok(LookupOutcome::Registered {
            record: parse_rdap_domain(domain, &source, &json, options.include_raw),
        })
    }
}

fn transport_failure(error: &reqwest::Error) -> WhoisError {
    let classified = categorize_reqwest_error(error);
    let failure = if classified.is(ErrorKind::Timeout) {
        WhoisFailure::Timeout
    } else {
        failure_from_message(&classified.message)
    };
    WhoisError::new(failure, classified.message)
}

/// Maps free-form error text onto a failure class.
pub fn failure_from_message(message: &str) -> WhoisFailure {
    let lower = message.to_lowercase();
    if UNSUPPORTED_SIGNATURES.iter().any(|sig| lower.contains(sig)) {
        WhoisFailure::UnsupportedTld
    } else if TIMEOUT_SIGNATURES.iter().any(|sig| lower.contains(sig)) {
        WhoisFailure::Timeout
    } else {
        WhoisFailure::Retry
    }
}

/// Reads `Retry-After` as delta-seconds or an HTTP date.
pub fn parse_retry_after(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    (at - now).to_std().ok()
}

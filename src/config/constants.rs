//! Configuration constants.
//!
//! This module defines all configuration constants used throughout the engine,
//! including timeouts, size limits, cache lifetimes and retry parameters.

use std::time::Duration;

// Network operation timeouts
/// Per-query timeout for a single DNS-over-HTTPS request in seconds
/// Most DoH answers arrive in well under a second; 3s fails fast on a dead provider
/// so the next one in the list still fits inside the caller's envelope
pub const DOH_TIMEOUT_SECS: u64 = 3;
/// TCP connect plus TLS handshake budget for the certificate chain walker
pub const TLS_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Bound on the close_notify exchange after a chain has been read
pub const TLS_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);
/// Per-request timeout for the guarded HTTP fetcher
pub const FETCH_TIMEOUT_SECS: u64 = 10;
/// Connect timeout for the guarded HTTP fetcher
pub const FETCH_CONNECT_TIMEOUT_SECS: u64 = 5;
/// Default RDAP lookup timeout in milliseconds
pub const RDAP_TIMEOUT_MS: u64 = 10_000;
/// Timeout for downloading the IANA RDAP bootstrap file
pub const BOOTSTRAP_TIMEOUT_SECS: u64 = 10;

/// Default User-Agent string for outbound requests.
pub const DEFAULT_USER_AGENT: &str =
    concat!("domain_intel/", env!("CARGO_PKG_VERSION"), " (+security-scanner)");

// Redirect handling
/// Default number of redirect hops the fetcher follows before giving up
/// Every hop is re-validated by the host guard, so keep this small
pub const DEFAULT_MAX_REDIRECTS: usize = 3;

// Response and body size limits
/// Default response body ceiling in bytes (2MB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
/// Body ceiling used when scraping HTML for SEO facts (truncation allowed)
pub const HTML_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Body ceiling for robots.txt (truncation allowed)
pub const ROBOTS_MAX_BODY_BYTES: usize = 256 * 1024;
/// Body ceiling for RDAP responses
pub const RDAP_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Body ceiling for the IANA bootstrap file (it is ~50KB today)
pub const BOOTSTRAP_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;
/// Maximum HTTP header value length in characters
/// Header values longer than this are truncated before they are stored
pub const MAX_HEADER_VALUE_LENGTH: usize = 1000;
/// Maximum number of response headers kept per snapshot
pub const MAX_HEADERS_PER_RESPONSE: usize = 100;

// Certificate chain walking
/// Hard bound on the number of certificates emitted for one chain
pub const MAX_CHAIN_DEPTH: usize = 10;

// DNS-over-HTTPS providers (tried strictly in order)
/// Primary DoH endpoint (JSON API)
pub const DOH_PRIMARY_URL: &str = "https://cloudflare-dns.com/dns-query";
/// First fallback DoH endpoint (JSON API)
pub const DOH_FALLBACK_URL: &str = "https://dns.google/resolve";
/// Second fallback DoH endpoint (JSON API)
pub const DOH_SECOND_FALLBACK_URL: &str = "https://dns.quad9.net:5053/dns-query";

// RDAP bootstrap
/// IANA RDAP bootstrap registry for domain names
pub const RDAP_BOOTSTRAP_URL: &str = "https://data.iana.org/rdap/dns.json";
/// How long a downloaded bootstrap file is trusted (7 days)
pub const BOOTSTRAP_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
/// After a failed bootstrap download, lookups run without one for this long
pub const BOOTSTRAP_FAILURE_BACKOFF: Duration = Duration::from_secs(5 * 60);

// In-flight request coalescing
/// Entries older than this are evicted even if their future never resolved
pub const INFLIGHT_MAX_AGE: Duration = Duration::from_secs(30);

// Artifact cache lifetimes
/// Floor and ceiling applied to the DNS TTL hint
pub const DNS_MIN_TTL: Duration = Duration::from_secs(5 * 60);
pub const DNS_MAX_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// DNS lifetime when no TTL hint is available
pub const DNS_DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);
/// Registration data changes rarely
pub const REGISTRATION_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Registration data for a domain expiring within `REGISTRATION_EXPIRY_WINDOW`
pub const REGISTRATION_NEAR_EXPIRY_TTL: Duration = Duration::from_secs(6 * 60 * 60);
pub const REGISTRATION_EXPIRY_WINDOW: Duration = Duration::from_secs(30 * 24 * 60 * 60);
/// Base lifetime for certificate chains (capped by the earliest expiry)
pub const CERTIFICATE_BASE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Lifetime of a chain whose earliest certificate has already expired
pub const CERTIFICATE_EXPIRED_TTL: Duration = Duration::from_secs(60 * 60);
pub const HEADERS_TTL: Duration = Duration::from_secs(12 * 60 * 60);
pub const SEO_TTL: Duration = Duration::from_secs(24 * 60 * 60);

// Retry strategy
/// Backoff base; delays grow as `base^n * factor` milliseconds
pub const RETRY_BACKOFF_BASE: u64 = 2;
/// Backoff factor in milliseconds (first delay = 2 * 500ms = 1s)
pub const RETRY_BACKOFF_FACTOR_MS: u64 = 500;
/// Maximum delay between retries in seconds
pub const RETRY_MAX_DELAY_SECS: u64 = 60;
/// A server-requested delay longer than this is not worth waiting for
pub const MAX_RETRY_WINDOW: Duration = Duration::from_secs(60 * 60);

// HTTP status codes (for clarity and consistency)
pub const HTTP_STATUS_METHOD_NOT_ALLOWED: u16 = 405;
pub const HTTP_STATUS_NOT_FOUND: u16 = 404;
pub const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;
pub const HTTP_STATUS_NOT_IMPLEMENTED: u16 = 501;

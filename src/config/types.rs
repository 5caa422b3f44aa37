//! Configuration types.
//!
//! This module defines the engine configuration struct and the logging enums
//! shared between the library and the command-line binary.

use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::config::constants::{
    BOOTSTRAP_TIMEOUT_SECS, DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_REDIRECTS, DEFAULT_USER_AGENT,
    DOH_FALLBACK_URL, DOH_PRIMARY_URL, DOH_SECOND_FALLBACK_URL, DOH_TIMEOUT_SECS,
    FETCH_CONNECT_TIMEOUT_SECS, FETCH_TIMEOUT_SECS, INFLIGHT_MAX_AGE, RDAP_BOOTSTRAP_URL,
    RDAP_TIMEOUT_MS, TLS_CONNECT_TIMEOUT_SECS,
};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// A DNS-over-HTTPS endpoint speaking the JSON API (`application/dns-json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DohProvider {
    /// Short name reported back as `resolver_used`
    pub name: String,
    /// Query endpoint, e.g. `https://cloudflare-dns.com/dns-query`
    pub endpoint: String,
}

impl DohProvider {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
        }
    }
}

/// Engine configuration (no CLI dependencies).
///
/// # Examples
///
/// ```no_run
/// use domain_intel::EngineConfig;
///
/// let config = EngineConfig {
///     max_redirects: 5,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Ordered DoH providers: primary first, then fallbacks
    pub doh_providers: Vec<DohProvider>,

    /// Timeout for a single DoH query
    pub doh_timeout: Duration,

    /// Per-request timeout for the guarded fetcher
    pub fetch_timeout: Duration,

    /// Connect timeout for the guarded fetcher
    pub fetch_connect_timeout: Duration,

    /// TCP connect plus TLS handshake budget for the chain walker
    pub tls_timeout: Duration,

    /// RDAP lookup timeout
    pub rdap_timeout: Duration,

    /// Timeout for the bootstrap download
    pub bootstrap_timeout: Duration,

    /// IANA RDAP bootstrap URL
    pub rdap_bootstrap_url: String,

    /// Redirect hops followed per fetch
    pub max_redirects: usize,

    /// Default body ceiling per fetch
    pub max_body_bytes: usize,

    /// Allow plain http:// targets in acquisition steps
    pub allow_http: bool,

    /// Optional allow-list of hostnames; `None` means any public host
    pub allowed_hosts: Option<Vec<String>>,

    /// Scheme of the home page and robots.txt fetched by the header and SEO steps
    pub site_scheme: String,

    /// Port for those fetches; `None` uses the scheme's default
    pub site_port: Option<u16>,

    /// Eviction age for stuck in-flight entries
    pub inflight_max_age: Duration,

    /// User-Agent sent on every request
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            doh_providers: vec![
                DohProvider::new("cloudflare", DOH_PRIMARY_URL),
                DohProvider::new("google", DOH_FALLBACK_URL),
                DohProvider::new("quad9", DOH_SECOND_FALLBACK_URL),
            ],
            doh_timeout: Duration::from_secs(DOH_TIMEOUT_SECS),
            fetch_timeout: Duration::from_secs(FETCH_TIMEOUT_SECS),
            fetch_connect_timeout: Duration::from_secs(FETCH_CONNECT_TIMEOUT_SECS),
            tls_timeout: Duration::from_secs(TLS_CONNECT_TIMEOUT_SECS),
            rdap_timeout: Duration::from_millis(RDAP_TIMEOUT_MS),
            bootstrap_timeout: Duration::from_secs(BOOTSTRAP_TIMEOUT_SECS),
            rdap_bootstrap_url: RDAP_BOOTSTRAP_URL.to_string(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            allow_http: false,
            allowed_hosts: None,
            site_scheme: "https".to_string(),
            site_port: None,
            inflight_max_age: INFLIGHT_MAX_AGE,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_redirects, DEFAULT_MAX_REDIRECTS);
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert_eq!(config.site_scheme, "https");
        assert!(config.site_port.is_none());
        assert!(!config.allow_http);
        assert_eq!(config.doh_providers.len(), 3);
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Warn),
            log::LevelFilter::Warn
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_log_level_ordering() {
        let error = log::LevelFilter::from(LogLevel::Error);
        let warn = log::LevelFilter::from(LogLevel::Warn);
        let info = log::LevelFilter::from(LogLevel::Info);
        let debug = log::LevelFilter::from(LogLevel::Debug);
        let trace = log::LevelFilter::from(LogLevel::Trace);

        assert!(error < warn);
        assert!(warn < info);
        assert!(info < debug);
        assert!(debug < trace);
    }

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.max_redirects, 3);
        assert_eq!(config.doh_providers.len(), 3);
        assert_eq!(config.doh_providers[0].name, "cloudflare");
        assert!(!config.allow_http);
        assert!(config.allowed_hosts.is_none());
        assert_eq!(config.inflight_max_age, Duration::from_secs(30));
    }

    #[test]
    fn test_default_providers_are_https() {
        for provider in EngineConfig::default().doh_providers {
            assert!(
                provider.endpoint.starts_with("https://"),
                "{} must be https",
                provider.name
            );
        }
    }
}

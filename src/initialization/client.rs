//! HTTP client initialization.
//!
//! Three clients are built from one [`EngineConfig`]:
//! - the DoH client, talking only to the configured resolver endpoints
//! - the guarded client used for user-derived URLs, with redirects disabled
//!   and hostname resolution routed through [`SafeResolver`]
//! - the RDAP client, talking to bootstrap-listed registry servers

use std::sync::Arc;

use reqwest::ClientBuilder;

use crate::config::EngineConfig;
use crate::dns::HostLookup;
use crate::security::SafeResolver;

/// Initializes the client used for DNS-over-HTTPS queries.
///
/// Redirects are disabled: a resolver endpoint that redirects is misconfigured.
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_doh_client(config: &EngineConfig) -> Result<reqwest::Client, reqwest::Error> {
    ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(config.doh_timeout)
        .connect_timeout(config.doh_timeout)
        .user_agent(config.user_agent.clone())
        .build()
}

/// Initializes the client for fetching user-derived URLs.
///
/// Creates a `reqwest::Client` with redirects disabled so the fetcher can run
/// the guard on every hop itself. Hostnames are resolved through `lookup`
/// behind a [`SafeResolver`], so the address that is connected to is one the
/// guard would accept. Proxies from the environment are ignored, since a
/// proxy would resolve the host itself and bypass that check.
///
/// # Arguments
///
/// * `config` - Engine configuration (timeouts, user agent)
/// * `lookup` - The DoH-backed host lookup
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_guarded_client(
    config: &EngineConfig,
    lookup: Arc<dyn HostLookup>,
) -> Result<reqwest::Client, reqwest::Error> {
    ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .dns_resolver(Arc::new(SafeResolver::new(lookup)))
        .timeout(config.fetch_timeout)
        .connect_timeout(config.fetch_connect_timeout)
        .user_agent(config.user_agent.clone())
        .build()
}

/// Initializes the client for RDAP bootstrap and registry queries.
///
/// Per-lookup deadlines are applied by the caller. Redirects are disabled so
/// the RDAP client can run the host guard on every registry redirect.
///
/// # Errors
///
/// Returns a `reqwest::Error` if client creation fails.
pub fn init_rdap_client(config: &EngineConfig) -> Result<reqwest::Client, reqwest::Error> {
    ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .connect_timeout(config.fetch_connect_timeout)
        .user_agent(config.user_agent.clone())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::DohResolver;

    #[test]
    fn test_clients_build_from_default_config() {
        let config = EngineConfig::default();
        let doh = init_doh_client(&config).expect("doh client");
        let resolver = Arc::new(DohResolver::new(doh, config.doh_providers.clone()));

        assert!(init_guarded_client(&config, resolver).is_ok());
        assert!(init_rdap_client(&config).is_ok());
    }
}

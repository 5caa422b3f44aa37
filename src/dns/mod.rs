//! DNS-over-HTTPS resolution.
//!
//! This module resolves domains through an ordered list of DoH providers
//! speaking the JSON API:
//! - Providers are tried strictly in order; answers are never mixed across providers
//! - Within one provider, A/AAAA/MX/TXT/NS queries run concurrently
//! - Answers are type-checked, normalized, deduplicated and sorted
//!
//! When every provider fails the caller gets a single retryable `dns_error`.

mod lookup;
mod normalize;
mod types;

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use log::{debug, warn};

use crate::config::{DohProvider, EngineConfig};
use crate::error_handling::{categorize_reqwest_error, ClassifiedError, ErrorKind};
use crate::fetch::read_body_limited;
use crate::providers::{ProviderCatalog, StaticCatalog};

// Re-export public API
pub use lookup::HostLookup;
pub use normalize::dedupe_and_sort;
pub use types::{DnsAnswer, DnsResolution, RecordType};

use normalize::normalize_answer;
use types::DohResponse;

/// DoH responses larger than this are treated as malformed.
const MAX_DOH_RESPONSE_BYTES: usize = 64 * 1024;

/// RCODE 0: no error.
const RCODE_NOERROR: u32 = 0;
/// RCODE 3: the name does not exist. A valid, empty answer.
const RCODE_NXDOMAIN: u32 = 3;

/// Resolver over an ordered list of DNS-over-HTTPS providers.
pub struct DohResolver {
    client: reqwest::Client,
    providers: Vec<DohProvider>,
    catalog: Arc<dyn ProviderCatalog>,
}

impl DohResolver {
    /// Creates a resolver from an HTTP client and provider list.
    ///
    /// The client should carry the DoH timeout (see
    /// `initialization::init_doh_client`).
    pub fn new(client: reqwest::Client, providers: Vec<DohProvider>) -> Self {
        Self {
            client,
            providers,
            catalog: Arc::new(StaticCatalog),
        }
    }

    /// Builds a resolver from the engine configuration.
    pub fn from_config(config: &EngineConfig) -> Result<Self, reqwest::Error> {
        let client = crate::initialization::init_doh_client(config)?;
        Ok(Self::new(client, config.doh_providers.clone()))
    }

    /// Replaces the catalog used to annotate answers.
    pub fn with_catalog(mut self, catalog: Arc<dyn ProviderCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn providers(&self) -> &[DohProvider] {
        &self.providers
    }

    /// Resolves A, AAAA, MX, TXT and NS records for `domain`.
    ///
    /// # Errors
    ///
    /// A retryable `dns_error` when every provider failed.
    pub async fn resolve(&self, domain: &str) -> Result<DnsResolution, ClassifiedError> {
        self.resolve_types(domain, &RecordType::ALL).await
    }

    /// Resolves the given record types, trying providers in order.
    pub async fn resolve_types(
        &self,
        domain: &str,
        types: &[RecordType],
    ) -> Result<DnsResolution, ClassifiedError> {
        let domain = domain.trim_end_matches('.').to_lowercase();
        let mut last_error: Option<ClassifiedError> = None;

        for provider in &self.providers {
            match self.query_provider(provider, &domain, types).await {
                Ok(records) => {
                    debug!(
                        "Resolved {} via {} ({} records)",
                        domain,
                        provider.name,
                        records.len()
                    );
                    return Ok(DnsResolution {
                        records,
                        resolver_used: provider.name.clone(),
                    });
                }
                Err(e) => {
                    warn!(
                        "DoH provider {} failed for {}: {}; trying next provider",
                        provider.name, domain, e
                    );
                    last_error = Some(e);
                }
            }
        }

        let detail = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no providers configured".to_string());
        Err(ClassifiedError::new(
            ErrorKind::DnsError,
            format!("all DoH providers failed for {domain}: {detail}"),
        ))
    }

    /// Runs one query per type against a single provider.
    ///
    /// Any failing query fails the whole provider attempt so partial answers
    /// are never returned.
    async fn query_provider(
        &self,
        provider: &DohProvider,
        domain: &str,
        types: &[RecordType],
    ) -> Result<Vec<DnsAnswer>, ClassifiedError> {
        let queries = types
            .iter()
            .map(|&record_type| self.query_type(provider, domain, record_type));
        let per_type = try_join_all(queries).await?;
        Ok(dedupe_and_sort(per_type.into_iter().flatten().collect()))
    }

    async fn query_type(
        &self,
        provider: &DohProvider,
        domain: &str,
        record_type: RecordType,
    ) -> Result<Vec<DnsAnswer>, ClassifiedError> {
        let response = self
            .client
            .get(&provider.endpoint)
            .query(&[("name", domain), ("type", record_type.as_str())])
            .header(reqwest::header::ACCEPT, "application/dns-json")
            .send()
            .await
            .map_err(|e| categorize_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifiedError::new(
                ErrorKind::InvalidResponse,
                format!("{} answered HTTP {}", provider.name, status.as_u16()),
            )
            .with_status(status.as_u16()));
        }

        let body = read_body_limited(response, MAX_DOH_RESPONSE_BYTES, false).await?;
        let parsed: DohResponse = serde_json::from_slice(&body.bytes).map_err(|e| {
            ClassifiedError::new(
                ErrorKind::InvalidResponse,
                format!("{} returned malformed JSON: {}", provider.name, e),
            )
        })?;

        match parsed.status {
            RCODE_NOERROR | RCODE_NXDOMAIN => {}
            rcode => {
                return Err(ClassifiedError::new(
                    ErrorKind::DnsError,
                    format!(
                        "{} returned rcode {} for {} {}",
                        provider.name, rcode, domain, record_type
                    ),
                ))
            }
        }

        Ok(parsed
            .answer
            .iter()
            .filter_map(|raw| normalize_answer(record_type, domain, raw, self.catalog.as_ref()))
            .collect())
    }
}

#[async_trait]
impl HostLookup for DohResolver {
    async fn lookup_ip(&self, host: &str) -> Result<Vec<IpAddr>, ClassifiedError> {
        let resolution = self.resolve_types(host, &RecordType::ADDRESSES).await?;
        let addrs: Vec<IpAddr> = resolution
            .records
            .iter()
            .filter_map(|r| r.value.parse().ok())
            .collect();
        if addrs.is_empty() {
            return Err(ClassifiedError::new(
                ErrorKind::DnsError,
                format!("{host} has no A/AAAA records"),
            ));
        }
        Ok(addrs)
    }
}

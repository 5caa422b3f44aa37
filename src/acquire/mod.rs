//! Durable acquisition surface.
//!
//! The [`Engine`] is what a durable step runtime drives:
//! - [`Engine::revalidate`] runs one `domain:kind` step (coalesced with
//!   identical in-flight steps), classifies failures into Fatal/Retry, and
//!   stores successes with an expiry from the staleness policy
//! - [`Engine::read`] returns the last-known-good artifact with its stale flag
//!   and asks the scheduler for a revalidation when stale, without blocking
//!
//! The engine never loops on failures itself.

mod seo;
mod steps;
mod store;
mod types;

use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use log::{debug, info, warn};

use crate::cache::{ttl_for, CachedArtifact, InflightCoalescer};
use crate::config::EngineConfig;
use crate::dns::{DohResolver, HostLookup};
use crate::domain::normalize_domain;
use crate::error_handling::{
    classify, ClassifiedError, FailureStats, InitializationError, RetryDecision,
};
use crate::fetch::{FetchOptions, Fetcher};
use crate::initialization::{
    init_crypto_provider, init_doh_client, init_guarded_client, init_rdap_client,
};
use crate::security::{GuardPolicy, HostGuard};
use crate::tls::TlsWalker;
use crate::whois::{LookupOptions, RdapClient};

// Re-export public API
pub use crate::cache::ArtifactKind;
pub use seo::{extract_html_metadata, extract_sitemaps, HtmlMetadata, RobotsInfo};
pub use steps::{CertificatesStep, DnsStep, HeadersStep, RegistrationStep, SeoStep, Step};
pub use store::{ArtifactStore, MemoryStore, RevalidationScheduler, StoredArtifact};
pub use types::{Artifact, HeadersArtifact, SeoArtifact, StepOutcome};

/// Acquisition engine wiring the fetchers to the store and the classifier.
pub struct Engine {
    resolver: Arc<DohResolver>,
    fetcher: Fetcher,
    walker: TlsWalker,
    rdap: RdapClient,
    /// Redirect cap, body ceiling and guard policy for header and SEO fetches
    fetch_options: FetchOptions,
    site_scheme: String,
    site_port: Option<u16>,
    lookup_options: LookupOptions,
    store: Arc<dyn ArtifactStore>,
    scheduler: Option<Arc<dyn RevalidationScheduler>>,
    inflight: InflightCoalescer<StoredArtifact>,
    stats: FailureStats,
}

impl Engine {
    /// Builds every component from `config`.
    ///
    /// # Errors
    ///
    /// Returns `InitializationError::HttpClientError` if an HTTP client cannot be built.
    pub fn from_config(
        config: &EngineConfig,
        store: Arc<dyn ArtifactStore>,
    ) -> Result<Self, InitializationError> {
        init_crypto_provider();
        let resolver = Arc::new(DohResolver::new(
            init_doh_client(config)?,
            config.doh_providers.clone(),
        ));
        let lookup: Arc<dyn HostLookup> = resolver.clone();

        let fetcher = Fetcher::new(
            init_guarded_client(config, Arc::clone(&lookup))?,
            Arc::new(HostGuard::new(Arc::clone(&lookup))),
        );
        let walker = TlsWalker::new(Arc::clone(&lookup)).with_timeout(config.tls_timeout);
        let rdap = RdapClient::from_config(
            init_rdap_client(config)?,
            Arc::new(HostGuard::new(Arc::clone(&lookup))),
            config,
        );

        let mut guard_policy = GuardPolicy::default().allow_http(config.allow_http);
        if let Some(hosts) = &config.allowed_hosts {
            guard_policy = guard_policy.allowed_hosts(hosts.iter().cloned());
        }
        let fetch_options = FetchOptions::default()
            .max_redirects(config.max_redirects)
            .max_bytes(config.max_body_bytes)
            .guard(guard_policy);

        Ok(Self {
            resolver,
            fetcher,
            walker,
            rdap,
            fetch_options,
            site_scheme: config.site_scheme.clone(),
            site_port: config.site_port,
            lookup_options: LookupOptions {
                timeout: config.rdap_timeout,
                include_raw: false,
            },
            store,
            scheduler: None,
            inflight: InflightCoalescer::new(config.inflight_max_age),
            stats: FailureStats::new(),
        })
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn RevalidationScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Replaces the fetcher used by the header and SEO steps.
    pub fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn stats(&self) -> &FailureStats {
        &self.stats
    }

    /// Builds the step for `domain:kind`. `domain` must already be normalized.
    pub fn step_for(&self, domain: &str, kind: ArtifactKind) -> Arc<dyn Step> {
        let domain = domain.to_string();
        match kind {
            ArtifactKind::Dns => Arc::new(DnsStep {
                domain,
                resolver: Arc::clone(&self.resolver),
            }),
            ArtifactKind::Registration => Arc::new(RegistrationStep {
                domain,
                rdap: self.rdap.clone(),
                options: self.lookup_options.clone(),
            }),
            ArtifactKind::Certificates => Arc::new(CertificatesStep {
                domain,
                walker: self.walker.clone(),
            }),
            ArtifactKind::Headers => Arc::new(HeadersStep {
                origin: self.site_origin(&domain),
                domain,
                fetcher: self.fetcher.clone(),
                options: self.fetch_options.clone(),
            }),
            ArtifactKind::Seo => Arc::new(SeoStep {
                origin: self.site_origin(&domain),
                domain,
                fetcher: self.fetcher.clone(),
                options: self.fetch_options.clone(),
            }),
        }
    }

    /// `scheme://domain[:port]` for the header and SEO steps.
    fn site_origin(&self, domain: &str) -> String {
        match self.site_port {
            Some(port) => format!("{}://{}:{}", self.site_scheme, domain, port),
            None => format!("{}://{}", self.site_scheme, domain),
        }
    }

    /// Acquires one artifact for `domain`.
    ///
    /// `attempt` is the zero-based attempt number supplied by the runtime and
    /// only feeds the default backoff.
    pub async fn revalidate(&self, domain: &str, kind: ArtifactKind, attempt: u32) -> StepOutcome {
        let domain = match normalize_domain(domain) {
            Ok(domain) => domain,
            Err(error) => return self.failed(error, attempt),
        };
        self.run_step(self.step_for(&domain, kind), attempt).await
    }

    /// Runs `step` through the coalescer, classifier, staleness policy and store.
    ///
    /// Coalesced callers share one execution and one stored copy, so they all
    /// report the same `fetched_at` and `expires_at`.
    pub async fn run_step(&self, step: Arc<dyn Step>, attempt: u32) -> StepOutcome {
        let key = step.key();
        let store = Arc::clone(&self.store);
        let result = self
            .inflight
            .run(&key, move || acquire_and_store(step, store).boxed())
            .await;

        match result {
            Ok(stored) => {
                info!("Step {} completed, fresh until {}", key, stored.expires_at);
                StepOutcome::Completed {
                    artifact: stored.artifact,
                    fetched_at: stored.fetched_at,
                    expires_at: stored.expires_at,
                }
            }
            Err(error) => {
                warn!("Step {} failed: {}", key, error);
                self.failed(error, attempt)
            }
        }
    }

    /// Returns the last-known-good artifact, stale or not.
    ///
    /// A stale artifact is still returned; the scheduler (if any) is asked to
    /// revalidate it out of band.
    ///
    /// # Errors
    ///
    /// `invalid_url` for an unusable domain, `storage` if the store fails.
    pub async fn read(
        &self,
        domain: &str,
        kind: ArtifactKind,
    ) -> Result<Option<CachedArtifact<Artifact>>, ClassifiedError> {
        let domain = normalize_domain(domain)?;
        let domain_id = self.store.ensure_domain_record(&domain).await?;
        let Some(stored) = self.store.get_cached(domain_id, kind).await? else {
            debug!("No cached {} for {}", kind, domain);
            return Ok(None);
        };

        let cached = CachedArtifact::new(
            stored.artifact,
            stored.fetched_at,
            stored.expires_at,
            Utc::now(),
        );
        if cached.stale {
            debug!("Cached {} for {} is stale", kind, domain);
            if let Some(scheduler) = &self.scheduler {
                scheduler.request_revalidation(&domain, kind);
            }
        }
        Ok(Some(cached))
    }

    fn failed(&self, error: ClassifiedError, attempt: u32) -> StepOutcome {
        let decision = classify(&error, attempt);
        self.stats.record(error.kind, decision);
        match decision {
            RetryDecision::Fatal => StepOutcome::Fatal { error },
            RetryDecision::Retryable { retry_after } => StepOutcome::Retry { error, retry_after },
        }
    }
}

/// Executes `step` and replaces the stored artifact with the result.
async fn acquire_and_store(
    step: Arc<dyn Step>,
    store: Arc<dyn ArtifactStore>,
) -> Result<StoredArtifact, ClassifiedError> {
    let artifact = step.execute().await?;
    let fetched_at = Utc::now();
    let expires_at = ttl_for(step.kind(), fetched_at, artifact.ttl_hint());

    let domain_id = store.ensure_domain_record(step.domain()).await?;
    store
        .replace_artifact(domain_id, artifact.clone(), fetched_at, expires_at)
        .await?;

    Ok(StoredArtifact {
        artifact,
        fetched_at,
        expires_at,
    })
}

//! Acquisition steps.
//!
//! Each step performs one typed acquisition for one domain and never retries
//! on its own; retry policy belongs to the classifier and the step runtime.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use super::seo::{extract_html_metadata, extract_sitemaps, RobotsInfo};
use super::types::{Artifact, HeadersArtifact, SeoArtifact};
use crate::cache::ArtifactKind;
use crate::config::{HTML_MAX_BODY_BYTES, ROBOTS_MAX_BODY_BYTES};
use crate::dns::DohResolver;
use crate::error_handling::ClassifiedError;
use crate::fetch::{FetchMethod, FetchOptions, Fetcher};
use crate::tls::{TlsWalker, DEFAULT_TLS_PORT};
use crate::whois::{LookupOptions, RdapClient};

/// One idempotent acquisition, identified by `domain:kind`.
#[async_trait]
pub trait Step: Send + Sync {
    fn domain(&self) -> &str;

    fn kind(&self) -> ArtifactKind;

    /// Stable idempotency key.
    fn key(&self) -> String {
        format!("{}:{}", self.domain(), self.kind())
    }

    async fn execute(&self) -> Result<Artifact, ClassifiedError>;
}

pub struct DnsStep {
    pub domain: String,
    pub resolver: Arc<DohResolver>,
}

#[async_trait]
impl Step for DnsStep {
    fn domain(&self) -> &str {
        &self.domain
    }

    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Dns
    }

    async fn execute(&self) -> Result<Artifact, ClassifiedError> {
        Ok(Artifact::Dns(self.resolver.resolve(&self.domain).await?))
    }
}

pub struct RegistrationStep {
    pub domain: String,
    pub rdap: RdapClient,
    pub options: LookupOptions,
}

#[async_trait]
impl Step for RegistrationStep {
    fn domain(&self) -> &str {
        &self.domain
    }

    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Registration
    }

    async fn execute(&self) -> Result<Artifact, ClassifiedError> {
        let outcome = self.rdap.lookup(&self.domain, &self.options).await?;
        Ok(Artifact::Registration(outcome))
    }
}

pub struct CertificatesStep {
    pub domain: String,
    pub walker: TlsWalker,
}

#[async_trait]
impl Step for CertificatesStep {
    fn domain(&self) -> &str {
        &self.domain
    }

    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Certificates
    }

    async fn execute(&self) -> Result<Artifact, ClassifiedError> {
        let chain = self.walker.fetch_chain(&self.domain, DEFAULT_TLS_PORT).await?;
        Ok(Artifact::Certificates(chain))
    }
}

/// HEAD of the home page, falling back to GET on 405.
pub struct HeadersStep {
    pub domain: String,
    /// Origin the home page is fetched from, e.g. `https://example.com`
    pub origin: String,
    pub fetcher: Fetcher,
    /// Engine-wide fetch limits and guard policy
    pub options: FetchOptions,
}

impl HeadersStep {
    /// Only the status and headers are kept, so an oversized body on the GET
    /// fallback is cut at the ceiling rather than failing the step.
    fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            method: FetchMethod::Head,
            head_fallback: true,
            allow_truncation: true,
            ..self.options.clone()
        }
    }
}

#[async_trait]
impl Step for HeadersStep {
    fn domain(&self) -> &str {
        &self.domain
    }

    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Headers
    }

    async fn execute(&self) -> Result<Artifact, ClassifiedError> {
        let url = format!("{}/", self.origin);
        let response = self.fetcher.fetch(&url, &self.fetch_options()).await?;
        Ok(Artifact::Headers(HeadersArtifact::from(response)))
    }
}

/// Home page metadata plus robots.txt sitemaps.
pub struct SeoStep {
    pub domain: String,
    pub origin: String,
    pub fetcher: Fetcher,
    pub options: FetchOptions,
}

impl SeoStep {
    /// GET with truncation, capped at `ceiling` or the engine limit if lower.
    fn scrape_options(&self, ceiling: usize) -> FetchOptions {
        FetchOptions {
            method: FetchMethod::Get,
            head_fallback: false,
            allow_truncation: true,
            max_bytes: self.options.max_bytes.min(ceiling),
            ..self.options.clone()
        }
    }

    async fn fetch_robots(&self) -> RobotsInfo {
        let url = format!("{}/robots.txt", self.origin);
        let options = self.scrape_options(ROBOTS_MAX_BODY_BYTES);

        match self.fetcher.fetch(&url, &options).await {
            Ok(response) if response.is_success() => RobotsInfo {
                present: true,
                status: Some(response.status),
                sitemaps: extract_sitemaps(&response.text()),
            },
            Ok(response) => RobotsInfo {
                present: false,
                status: Some(response.status),
                sitemaps: Vec::new(),
            },
            Err(e) => {
                debug!("robots.txt for {} unavailable: {}", self.domain, e);
                RobotsInfo::default()
            }
        }
    }
}

#[async_trait]
impl Step for SeoStep {
    fn domain(&self) -> &str {
        &self.domain
    }

    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Seo
    }

    async fn execute(&self) -> Result<Artifact, ClassifiedError> {
        let url = format!("{}/", self.origin);
        let page = self
            .fetcher
            .fetch(&url, &self.scrape_options(HTML_MAX_BODY_BYTES))
            .await?;

        let metadata = if page.is_success() {
            extract_html_metadata(&page.text(), &page.final_url)
        } else {
            Default::default()
        };
        let robots = self.fetch_robots().await;

        Ok(Artifact::Seo(SeoArtifact {
            final_url: page.final_url,
            status: page.status,
            truncated: page.truncated,
            metadata,
            robots,
        }))
    }
}

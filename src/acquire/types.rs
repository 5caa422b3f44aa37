//! Artifact payloads and step outcomes.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::seo::{HtmlMetadata, RobotsInfo};
use crate::cache::{ArtifactKind, TtlHint};
use crate::dns::DnsResolution;
use crate::error_handling::ClassifiedError;
use crate::fetch::{FetchMethod, FetchResponse, HttpHeader, RedirectHop};
use crate::tls::CertificateChain;
use crate::whois::LookupOutcome;

/// Response headers of the domain's home page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadersArtifact {
    pub final_url: String,
    pub status: u16,
    /// GET when the server refused HEAD
    pub method: FetchMethod,
    pub headers: Vec<HttpHeader>,
    pub redirects: Vec<RedirectHop>,
}

impl From<FetchResponse> for HeadersArtifact {
    fn from(response: FetchResponse) -> Self {
        Self {
            final_url: response.final_url,
            status: response.status,
            method: response.method,
            headers: response.headers,
            redirects: response.redirects,
        }
    }
}

/// Search-engine facing facts about the home page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeoArtifact {
    pub final_url: String,
    pub status: u16,
    /// The HTML was cut at the byte ceiling before parsing
    pub truncated: bool,
    #[serde(flatten)]
    pub metadata: HtmlMetadata,
    pub robots: RobotsInfo,
}

/// One acquired artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Artifact {
    Dns(DnsResolution),
    Registration(LookupOutcome),
    Certificates(CertificateChain),
    Headers(HeadersArtifact),
    Seo(SeoArtifact),
}

impl Artifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::Dns(_) => ArtifactKind::Dns,
            Artifact::Registration(_) => ArtifactKind::Registration,
            Artifact::Certificates(_) => ArtifactKind::Certificates,
            Artifact::Headers(_) => ArtifactKind::Headers,
            Artifact::Seo(_) => ArtifactKind::Seo,
        }
    }

    /// Payload-derived input to the staleness policy.
    pub fn ttl_hint(&self) -> Option<TtlHint> {
        match self {
            Artifact::Dns(resolution) => resolution.min_ttl().map(TtlHint::DnsTtl),
            Artifact::Registration(LookupOutcome::Registered { record }) => {
                record.expiration_date.map(TtlHint::RegistrationExpiry)
            }
            Artifact::Certificates(chain) => {
                chain.earliest_expiry().map(TtlHint::CertificateExpiry)
            }
            _ => None,
        }
    }
}

/// What a step invocation hands back to the durable step runtime.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Completed {
        artifact: Artifact,
        fetched_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    },
    /// Do not retry
    Fatal { error: ClassifiedError },
    /// Retry after `retry_after`
    Retry {
        error: ClassifiedError,
        #[serde(rename = "retry_after_ms", serialize_with = "as_millis")]
        retry_after: Duration,
    },
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl StepOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, StepOutcome::Completed { .. })
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, StepOutcome::Fatal { .. })
    }

    pub fn error(&self) -> Option<&ClassifiedError> {
        match self {
            StepOutcome::Completed { .. } => None,
            StepOutcome::Fatal { error } | StepOutcome::Retry { error, .. } => Some(error),
        }
    }
}

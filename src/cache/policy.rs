//! Per-kind staleness policy.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::types::ArtifactKind;
use crate::config::{
    CERTIFICATE_BASE_TTL, CERTIFICATE_EXPIRED_TTL, DNS_DEFAULT_TTL, DNS_MAX_TTL, DNS_MIN_TTL,
    HEADERS_TTL, REGISTRATION_EXPIRY_WINDOW, REGISTRATION_NEAR_EXPIRY_TTL, REGISTRATION_TTL,
    SEO_TTL,
};

/// Domain-specific input to [`ttl_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlHint {
    /// Smallest record TTL in a DNS answer, in seconds
    DnsTtl(u32),
    /// Registration expiry date
    RegistrationExpiry(DateTime<Utc>),
    /// Earliest `not_after` in a certificate chain
    CertificateExpiry(DateTime<Utc>),
}

/// Lifetime of an artifact of `kind` fetched now.
///
/// - DNS: the answer's TTL clamped to [5m, 24h]; 1h without one
/// - Registration: 24h, or 6h when the domain expires within 30 days
/// - Certificates: the lesser of 24h and the time left on the earliest
///   certificate; 1h once that certificate has already expired
/// - Headers: 12h; SEO: 24h
pub fn lifetime_for(kind: ArtifactKind, fetched_at: DateTime<Utc>, hint: Option<TtlHint>) -> Duration {
    match kind {
        ArtifactKind::Dns => match hint {
            Some(TtlHint::DnsTtl(secs)) => {
                Duration::from_secs(u64::from(secs)).clamp(DNS_MIN_TTL, DNS_MAX_TTL)
            }
            _ => DNS_DEFAULT_TTL,
        },
        ArtifactKind::Registration => match hint {
            Some(TtlHint::RegistrationExpiry(expiry))
                if remaining(fetched_at, expiry) <= REGISTRATION_EXPIRY_WINDOW =>
            {
                REGISTRATION_NEAR_EXPIRY_TTL
            }
            _ => REGISTRATION_TTL,
        },
        ArtifactKind::Certificates => match hint {
            Some(TtlHint::CertificateExpiry(expiry)) => match remaining(fetched_at, expiry) {
                Duration::ZERO => CERTIFICATE_EXPIRED_TTL,
                left => left.min(CERTIFICATE_BASE_TTL),
            },
            _ => CERTIFICATE_BASE_TTL,
        },
        ArtifactKind::Headers => HEADERS_TTL,
        ArtifactKind::Seo => SEO_TTL,
    }
}

/// Expiry timestamp of an artifact of `kind` fetched at `fetched_at`.
pub fn ttl_for(kind: ArtifactKind, fetched_at: DateTime<Utc>, hint: Option<TtlHint>) -> DateTime<Utc> {
    let lifetime = lifetime_for(kind, fetched_at, hint);
    let lifetime = chrono::Duration::from_std(lifetime).unwrap_or(chrono::Duration::zero());
    fetched_at + lifetime
}

/// `true` once `now` has reached `expires_at`.
pub fn is_stale(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= expires_at
}

/// Time from `from` until `until`; zero when already past.
fn remaining(from: DateTime<Utc>, until: DateTime<Utc>) -> Duration {
    (until - from).to_std().unwrap_or(Duration::ZERO)
}

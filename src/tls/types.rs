//! Certificate chain data structures.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::providers::ProviderRef;

/// One certificate in a walked chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateNode {
    pub subject: String,
    pub issuer: String,
    /// DNS names from the subjectAltName extension, lowercase
    pub sans: Vec<String>,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    /// Hex serial number
    pub serial: String,
    /// Known CA operator behind the issuer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer_provider: Option<ProviderRef>,
}

impl CertificateNode {
    pub fn is_self_signed(&self) -> bool {
        self.subject == self.issuer
    }
}

/// Result of a successful chain walk, leaf first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateChain {
    pub host: String,
    pub port: u16,
    pub chain: Vec<CertificateNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cipher_suite: Option<String>,
}

impl CertificateChain {
    /// The soonest `not_after` across the chain.
    pub fn earliest_expiry(&self) -> Option<DateTime<Utc>> {
        self.chain.iter().map(|c| c.not_after).min()
    }

    pub fn leaf(&self) -> Option<&CertificateNode> {
        self.chain.first()
    }
}

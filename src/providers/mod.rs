//! Known-provider catalog.
//!
//! Annotates observed names (nameservers, mail exchangers, certificate
//! issuers) and addresses with a known provider identity. The engine consumes
//! the catalog through the [`ProviderCatalog`] trait so a richer catalog can
//! be plugged in by the host application.

mod cdn;

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

pub use cdn::{match_cdn_address, CdnRange};

/// Identity of a known infrastructure provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderRef {
    /// Stable identifier, e.g. `cloudflare`
    pub id: String,
    /// Display name, e.g. `Cloudflare`
    pub name: String,
}

impl ProviderRef {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

/// Lookup interface for the provider catalog collaborator.
pub trait ProviderCatalog: Send + Sync {
    /// Matches a host name (or an issuer string) against known providers.
    fn match_provider(&self, observed_name: &str) -> Option<ProviderRef>;

    /// Matches an address against known CDN edge ranges.
    fn match_address(&self, ip: IpAddr) -> Option<ProviderRef> {
        match_cdn_address(ip)
    }
}

/// Suffix rules: (suffix of the observed name, provider id, provider name).
const NAME_RULES: &[(&str, &str, &str)] = &[
    // DNS hosting
    ("ns.cloudflare.com", "cloudflare", "Cloudflare"),
    ("awsdns", "aws", "Amazon Web Services"),
    ("googledomains.com", "google", "Google"),
    ("domaincontrol.com", "godaddy", "GoDaddy"),
    ("registrar-servers.com", "namecheap", "Namecheap"),
    ("azure-dns.com", "azure", "Microsoft Azure"),
    ("nsone.net", "ns1", "NS1"),
    ("dnsimple.com", "dnsimple", "DNSimple"),
    // Mail
    ("google.com", "google", "Google"),
    ("googlemail.com", "google", "Google"),
    ("outlook.com", "microsoft", "Microsoft"),
    ("pphosted.com", "proofpoint", "Proofpoint"),
    ("mimecast.com", "mimecast", "Mimecast"),
    ("zoho.com", "zoho", "Zoho"),
    // CDN
    ("cloudfront.net", "cloudfront", "Amazon CloudFront"),
    ("fastly.net", "fastly", "Fastly"),
    ("akamaiedge.net", "akamai", "Akamai"),
    ("edgekey.net", "akamai", "Akamai"),
];

/// Substring rules for certificate issuer distinguished names.
const ISSUER_RULES: &[(&str, &str, &str)] = &[
    ("let's encrypt", "letsencrypt", "Let's Encrypt"),
    ("google trust services", "google", "Google Trust Services"),
    ("digicert", "digicert", "DigiCert"),
    ("sectigo", "sectigo", "Sectigo"),
    ("amazon", "aws", "Amazon"),
    ("globalsign", "globalsign", "GlobalSign"),
    ("zerossl", "zerossl", "ZeroSSL"),
    ("cloudflare", "cloudflare", "Cloudflare"),
];

/// Built-in catalog with a fixed rule set.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog;

impl ProviderCatalog for StaticCatalog {
    fn match_provider(&self, observed_name: &str) -> Option<ProviderRef> {
        let lower = observed_name.trim_end_matches('.').to_lowercase();
        if lower.is_empty() {
            return None;
        }
        // Distinguished names contain '=' ("CN=R3, O=Let's Encrypt").
        if lower.contains('=') {
            return ISSUER_RULES
                .iter()
                .find(|(needle, _, _)| lower.contains(needle))
                .map(|(_, id, name)| ProviderRef::new(id, name));
        }
        NAME_RULES
            .iter()
            .find(|(suffix, _, _)| {
                if suffix.contains('.') {
                    lower == *suffix || lower.ends_with(&format!(".{suffix}"))
                } else {
                    lower.split('.').any(|label| label.starts_with(suffix))
                }
            })
            .map(|(_, id, name)| ProviderRef::new(id, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_nameserver() {
        let catalog = StaticCatalog;
        let provider = catalog.match_provider("ada.ns.cloudflare.com.").unwrap();
        assert_eq!(provider.id, "cloudflare");
        let provider = catalog.match_provider("ns-123.awsdns-45.org").unwrap();
        assert_eq!(provider.id, "aws");
    }

    #[test]
    fn test_match_mail_exchanger() {
        let catalog = StaticCatalog;
        assert_eq!(
            catalog.match_provider("aspmx.l.google.com").unwrap().id,
            "google"
        );
        assert_eq!(
            catalog
                .match_provider("example-com.mail.protection.outlook.com")
                .unwrap()
                .id,
            "microsoft"
        );
    }

    #[test]
    fn test_suffix_must_align_with_label() {
        let catalog = StaticCatalog;
        assert!(catalog.match_provider("notgoogle.com").is_none());
        assert!(catalog.match_provider("example.org").is_none());
        assert!(catalog.match_provider("").is_none());
    }

    #[test]
    fn test_match_issuer() {
        let catalog = StaticCatalog;
        let provider = catalog
            .match_provider("C=US, O=Let's Encrypt, CN=R3")
            .unwrap();
        assert_eq!(provider.id, "letsencrypt");
    }

    #[test]
    fn test_default_address_matching_uses_cdn_ranges() {
        let catalog = StaticCatalog;
        let ip: IpAddr = "104.16.132.229".parse().unwrap();
        assert_eq!(catalog.match_address(ip).unwrap().id, "cloudflare");
        let ip: IpAddr = "93.184.216.34".parse().unwrap();
        assert!(catalog.match_address(ip).is_none());
    }
}

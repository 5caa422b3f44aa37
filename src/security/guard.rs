//! Host/IP guard (SSRF protection).
//!
//! Every outbound URL derived from user input passes through
//! [`UrlGuard::ensure_allowed`] before a request is issued, and again for
//! every redirect hop. The guard rejects:
//! - Non-HTTP(S) schemes, and plain HTTP unless the policy allows it
//! - Hardcoded internal hostnames (`localhost`, `*.local`, `*.internal`, ...)
//! - Hosts outside an explicit allow-list, when one is configured
//! - Any host that resolves to even one non-public address

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use url::{Host, Url};

use super::ip::{is_public_ip, ResolvedAddress};
use crate::dns::HostLookup;
use crate::error_handling::{ClassifiedError, ErrorKind};

/// Exact hostnames that never leave the machine or the local network.
const BLOCKED_HOSTS: &[&str] = &["localhost", "localhost.localdomain", "broadcasthost"];

/// Hostname suffixes reserved for local or internal use.
const BLOCKED_SUFFIXES: &[&str] = &[".localhost", ".local", ".internal", ".localdomain", ".home.arpa"];

/// Per-call guard policy.
#[derive(Debug, Clone, Default)]
pub struct GuardPolicy {
    /// Permit `http://` in addition to `https://`
    pub allow_http: bool,
    /// When set, only these hostnames (lowercase, exact) are permitted
    pub allowed_hosts: Option<Vec<String>>,
}

impl GuardPolicy {
    pub fn allow_http(mut self, allow: bool) -> Self {
        self.allow_http = allow;
        self
    }

    pub fn allowed_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_hosts = Some(
            hosts
                .into_iter()
                .map(|h| h.into().trim_end_matches('.').to_lowercase())
                .collect(),
        );
        self
    }
}

/// Decides whether a URL may be fetched.
#[async_trait]
pub trait UrlGuard: Send + Sync {
    /// Validates `url` and returns the addresses its host resolved to.
    ///
    /// # Errors
    ///
    /// `invalid_url`, `protocol_not_allowed`, `host_blocked`,
    /// `host_not_allowed`, `dns_error` or `private_ip`.
    async fn ensure_allowed(
        &self,
        url: &Url,
        policy: &GuardPolicy,
    ) -> Result<Vec<ResolvedAddress>, ClassifiedError>;
}

/// The production guard: static checks plus a DoH lookup of every address.
#[derive(Clone)]
pub struct HostGuard {
    lookup: Arc<dyn HostLookup>,
}

impl HostGuard {
    pub fn new(lookup: Arc<dyn HostLookup>) -> Self {
        Self { lookup }
    }

    /// Parses and validates a URL string.
    pub async fn ensure_allowed_str(
        &self,
        url: &str,
        policy: &GuardPolicy,
    ) -> Result<Vec<ResolvedAddress>, ClassifiedError> {
        let url = parse_target(url)?;
        self.ensure_allowed(&url, policy).await
    }
}

#[async_trait]
impl UrlGuard for HostGuard {
    async fn ensure_allowed(
        &self,
        url: &Url,
        policy: &GuardPolicy,
    ) -> Result<Vec<ResolvedAddress>, ClassifiedError> {
        let host = check_static(url, policy)?;

        let ips = match host {
            Host::Ipv4(ip) => vec![IpAddr::V4(ip)],
            Host::Ipv6(ip) => vec![IpAddr::V6(ip)],
            Host::Domain(name) => self.lookup.lookup_ip(&name).await.map_err(|e| {
                ClassifiedError::new(
                    ErrorKind::DnsError,
                    format!("could not resolve {}: {}", name, e.message),
                )
            })?,
        };

        if ips.is_empty() {
            return Err(ClassifiedError::new(
                ErrorKind::DnsError,
                format!("{} resolved to no addresses", url.host_str().unwrap_or_default()),
            ));
        }
        ensure_all_public(url.host_str().unwrap_or_default(), &ips)?;

        Ok(ips.into_iter().map(ResolvedAddress::from).collect())
    }
}

/// Parses a user-supplied URL, mapping failures to `invalid_url`.
pub fn parse_target(url: &str) -> Result<Url, ClassifiedError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(ClassifiedError::new(ErrorKind::InvalidUrl, "empty URL"));
    }
    Url::parse(trimmed).map_err(|e| {
        ClassifiedError::new(ErrorKind::InvalidUrl, format!("invalid URL {trimmed}: {e}"))
    })
}

/// Scheme, hostname and allow-list checks that need no network.
///
/// Returns the host with domain names lowercased and stripped of a
/// trailing dot.
pub fn check_static(url: &Url, policy: &GuardPolicy) -> Result<Host<String>, ClassifiedError> {
    // Internal address literals report as private_ip even when the scheme is also refused.
    if matches!(url.scheme(), "http" | "https") {
        let literal = match url.host() {
            Some(Host::Ipv4(ip)) => Some(IpAddr::V4(ip)),
            Some(Host::Ipv6(ip)) => Some(IpAddr::V6(ip)),
            _ => None,
        };
        if let Some(ip) = literal {
            ensure_all_public(&ip.to_string(), &[ip])?;
        }
    }

    match url.scheme() {
        "https" => {}
        "http" if policy.allow_http => {}
        scheme => {
            debug!("Guard rejected scheme {} for {}", scheme, url);
            return Err(ClassifiedError::new(
                ErrorKind::ProtocolNotAllowed,
                format!("scheme '{scheme}' is not allowed"),
            ));
        }
    }

    let host = match url.host() {
        Some(Host::Domain(d)) if d.trim_end_matches('.').is_empty() => {
            return Err(ClassifiedError::new(ErrorKind::InvalidUrl, "URL has an empty host"))
        }
        Some(Host::Domain(d)) => Host::Domain(d.trim_end_matches('.').to_lowercase()),
        Some(Host::Ipv4(ip)) => Host::Ipv4(ip),
        Some(Host::Ipv6(ip)) => Host::Ipv6(ip),
        None => {
            return Err(ClassifiedError::new(
                ErrorKind::InvalidUrl,
                format!("URL has no host: {url}"),
            ))
        }
    };

    if let Host::Domain(name) = &host {
        if is_blocked_hostname(name) {
            debug!("Guard rejected blocked hostname {}", name);
            return Err(ClassifiedError::new(
                ErrorKind::HostBlocked,
                format!("host '{name}' is blocked"),
            ));
        }
    }

    if let Some(allowed) = &policy.allowed_hosts {
        let name = match &host {
            Host::Domain(d) => d.clone(),
            other => other.to_string(),
        };
        if !allowed.iter().any(|a| a == &name) {
            debug!("Guard rejected {} (not in allow-list)", name);
            return Err(ClassifiedError::new(
                ErrorKind::HostNotAllowed,
                format!("host '{name}' is not in the allow-list"),
            ));
        }
    }

    Ok(host)
}

/// Fails when any one of `ips` is non-public.
pub fn ensure_all_public(host: &str, ips: &[IpAddr]) -> Result<(), ClassifiedError> {
    if let Some(bad) = ips.iter().find(|ip| !is_public_ip(**ip)) {
        debug!("Guard rejected {}: resolves to non-public {}", host, bad);
        return Err(ClassifiedError::new(
            ErrorKind::PrivateIp,
            format!("{host} resolves to non-public address {bad}"),
        ));
    }
    Ok(())
}

fn is_blocked_hostname(name: &str) -> bool {
    BLOCKED_HOSTS.contains(&name) || BLOCKED_SUFFIXES.iter().any(|s| name.ends_with(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Lookup backed by a fixed table.
    struct StaticLookup(HashMap<&'static str, Vec<IpAddr>>);

    #[async_trait]
    impl HostLookup for StaticLookup {
        async fn lookup_ip(&self, host: &str) -> Result<Vec<IpAddr>, ClassifiedError> {
            self.0
                .get(host)
                .cloned()
                .ok_or_else(|| ClassifiedError::new(ErrorKind::DnsError, "NXDOMAIN"))
        }
    }

    fn guard() -> HostGuard {
        let mut table = HashMap::new();
        table.insert("example.com", vec!["93.184.216.34".parse().unwrap()]);
        table.insert(
            "mixed.example",
            vec!["93.184.216.34".parse().unwrap(), "10.0.0.5".parse().unwrap()],
        );
        table.insert("rebind.example", vec!["127.0.0.1".parse().unwrap()]);
        HostGuard::new(Arc::new(StaticLookup(table)))
    }

    async fn check(url: &str, policy: &GuardPolicy) -> Result<Vec<ResolvedAddress>, ErrorKind> {
        guard()
            .ensure_allowed_str(url, policy)
            .await
            .map_err(|e| e.kind)
    }

    #[tokio::test]
    async fn test_public_host_allowed() {
        let addrs = check("https://example.com/path", &GuardPolicy::default())
            .await
            .unwrap();
        assert_eq!(addrs.len(), 1);
    }

    #[tokio::test]
    async fn test_http_requires_opt_in() {
        let strict = GuardPolicy::default();
        assert_eq!(
            check("http://example.com", &strict).await.unwrap_err(),
            ErrorKind::ProtocolNotAllowed
        );
        let lenient = GuardPolicy::default().allow_http(true);
        assert!(check("http://example.com", &lenient).await.is_ok());
    }

    #[tokio::test]
    async fn test_other_schemes_rejected() {
        let policy = GuardPolicy::default().allow_http(true);
        for url in ["file:///etc/passwd", "ftp://example.com", "gopher://example.com"] {
            assert_eq!(
                check(url, &policy).await.unwrap_err(),
                ErrorKind::ProtocolNotAllowed,
                "{url}"
            );
        }
    }

    #[tokio::test]
    async fn test_invalid_urls() {
        let policy = GuardPolicy::default();
        assert_eq!(check("", &policy).await.unwrap_err(), ErrorKind::InvalidUrl);
        assert_eq!(check("not a url", &policy).await.unwrap_err(), ErrorKind::InvalidUrl);
    }

    #[tokio::test]
    async fn test_blocked_hostnames() {
        let policy = GuardPolicy::default();
        for url in [
            "https://localhost/",
            "https://LOCALHOST./",
            "https://api.localhost/",
            "https://printer.local/",
            "https://metadata.google.internal/",
        ] {
            assert_eq!(check(url, &policy).await.unwrap_err(), ErrorKind::HostBlocked, "{url}");
        }
    }

    #[tokio::test]
    async fn test_allow_list() {
        let policy = GuardPolicy::default().allowed_hosts(["Example.com."]);
        assert!(check("https://example.com/", &policy).await.is_ok());
        assert_eq!(
            check("https://mixed.example/", &policy).await.unwrap_err(),
            ErrorKind::HostNotAllowed
        );
    }

    #[tokio::test]
    async fn test_private_literals_rejected() {
        let policy = GuardPolicy::default().allow_http(true);
        for url in [
            "http://127.0.0.1/",
            "http://169.254.169.254/latest/meta-data/",
            "http://10.1.2.3/",
            "http://[::1]/",
            "http://[::ffff:192.168.0.1]/",
        ] {
            assert_eq!(check(url, &policy).await.unwrap_err(), ErrorKind::PrivateIp, "{url}");
        }
    }

    #[tokio::test]
    async fn test_private_literal_over_http_is_private_ip_without_opt_in() {
        assert_eq!(
            check("http://169.254.169.254/", &GuardPolicy::default())
                .await
                .unwrap_err(),
            ErrorKind::PrivateIp
        );
    }

    #[tokio::test]
    async fn test_one_private_address_fails_closed() {
        assert_eq!(
            check("https://mixed.example/", &GuardPolicy::default())
                .await
                .unwrap_err(),
            ErrorKind::PrivateIp
        );
        assert_eq!(
            check("https://rebind.example/", &GuardPolicy::default())
                .await
                .unwrap_err(),
            ErrorKind::PrivateIp
        );
    }

    #[tokio::test]
    async fn test_resolution_failure_is_dns_error() {
        assert_eq!(
            check("https://nxdomain.example/", &GuardPolicy::default())
                .await
                .unwrap_err(),
            ErrorKind::DnsError
        );
    }
}

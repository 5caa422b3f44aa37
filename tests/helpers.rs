// Shared test helpers for mock-server based tests.
//
// The mock servers listen on 127.0.0.1, which the production guard rejects.
// `LoopbackGuard` admits exactly the mock server's address and hands every
// other URL to a real `HostGuard`, so redirects off the mock are still
// checked the way production checks them.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use domain_intel::dns::HostLookup;
use domain_intel::error_handling::{ClassifiedError, ErrorKind};
use domain_intel::security::{GuardPolicy, HostGuard, ResolvedAddress, UrlGuard};

/// Host lookup answering from a fixed table.
#[derive(Default)]
#[allow(dead_code)] // Used by other test files
pub struct StaticLookup {
    table: HashMap<String, Vec<IpAddr>>,
}

#[allow(dead_code)]
impl StaticLookup {
    pub fn with(mut self, host: &str, ips: &[&str]) -> Self {
        let ips = ips
            .iter()
            .map(|ip| ip.parse().expect("valid IP in test table"))
            .collect();
        self.table.insert(host.to_string(), ips);
        self
    }
}

#[async_trait]
impl HostLookup for StaticLookup {
    async fn lookup_ip(&self, host: &str) -> Result<Vec<IpAddr>, ClassifiedError> {
        self.table
            .get(host)
            .cloned()
            .ok_or_else(|| ClassifiedError::new(ErrorKind::DnsError, format!("NXDOMAIN {host}")))
    }
}

/// Host lookup that answers with a public address first, then a private one.
#[allow(dead_code)]
pub struct RebindingLookup {
    pub public: IpAddr,
    pub private: IpAddr,
    pub calls: AtomicUsize,
}

#[async_trait]
impl HostLookup for RebindingLookup {
    async fn lookup_ip(&self, _host: &str) -> Result<Vec<IpAddr>, ClassifiedError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(vec![self.public])
        } else {
            Ok(vec![self.private])
        }
    }
}

/// Admits the mock server's loopback address; delegates everything else.
#[allow(dead_code)]
pub struct LoopbackGuard {
    pub mock: Url,
    pub inner: HostGuard,
}

#[allow(dead_code)]
impl LoopbackGuard {
    pub fn new(mock_uri: &str, lookup: Arc<dyn HostLookup>) -> Self {
        Self {
            mock: Url::parse(mock_uri).expect("mock uri"),
            inner: HostGuard::new(lookup),
        }
    }
}

#[async_trait]
impl UrlGuard for LoopbackGuard {
    async fn ensure_allowed(
        &self,
        url: &Url,
        policy: &GuardPolicy,
    ) -> Result<Vec<ResolvedAddress>, ClassifiedError> {
        let same_origin = url.host_str() == self.mock.host_str()
            && url.port_or_known_default() == self.mock.port_or_known_default();
        if same_origin {
            if url.scheme() == "http" && !policy.allow_http {
                return Err(ClassifiedError::new(
                    ErrorKind::ProtocolNotAllowed,
                    "scheme 'http' is not allowed",
                ));
            }
            return Ok(Vec::new());
        }
        self.inner.ensure_allowed(url, policy).await
    }
}

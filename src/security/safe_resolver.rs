//! SSRF-safe DNS resolver for reqwest.
//!
//! Implements `reqwest::dns::Resolve` on top of the DoH [`HostLookup`] and
//! then validates that every returned IP is public. If even one address is
//! private the whole answer is refused *before* reqwest opens a TCP socket,
//! closing the gap between the guard's check and the connect (DNS rebinding).

use std::net::SocketAddr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use tokio::sync::Semaphore;

use super::guard::ensure_all_public;
use crate::dns::HostLookup;

/// Concurrency limiter for connection-time lookups (prevent resource exhaustion)
static DNS_SEMAPHORE: Lazy<Arc<Semaphore>> = Lazy::new(|| Arc::new(Semaphore::new(64)));

/// A reqwest resolver that fails closed on any non-public address.
///
/// Rejections carry a `ClassifiedError` with kind `private_ip` as the error
/// source, which `categorize_reqwest_error` recovers from the chain.
#[derive(Clone)]
pub struct SafeResolver {
    lookup: Arc<dyn HostLookup>,
}

impl SafeResolver {
    pub fn new(lookup: Arc<dyn HostLookup>) -> Self {
        Self { lookup }
    }
}

impl Resolve for SafeResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let lookup = Arc::clone(&self.lookup);
        Box::pin(async move {
            let _permit = DNS_SEMAPHORE
                .acquire()
                .await
                .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> { Box::new(e) })?;

            let host = name.as_str();
            let ips = lookup
                .lookup_ip(host)
                .await
                .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> { Box::new(e) })?;

            ensure_all_public(host, &ips)
                .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> { Box::new(e) })?;

            let addrs: Vec<SocketAddr> = ips.into_iter().map(|ip| SocketAddr::new(ip, 0)).collect();
            let addrs: Addrs = Box::new(addrs.into_iter());
            Ok(addrs)
        })
    }
}

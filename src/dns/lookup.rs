//! Host-to-address lookup seam.
//!
//! The host guard, the connection-time resolver and the certificate walker
//! all need "hostname to every address" without touching the OS resolver
//! (`getaddrinfo` runs on the blocking thread pool and exhausts it under
//! load). They depend on this trait; the DoH resolver implements it.

use std::net::IpAddr;

use async_trait::async_trait;

use crate::error_handling::ClassifiedError;

/// Resolves a hostname to **all** of its addresses.
#[async_trait]
pub trait HostLookup: Send + Sync {
    /// Returns every A and AAAA address for `host`.
    ///
    /// # Errors
    ///
    /// `dns_error` when the name does not resolve or the lookup failed.
    async fn lookup_ip(&self, host: &str) -> Result<Vec<IpAddr>, ClassifiedError>;
}

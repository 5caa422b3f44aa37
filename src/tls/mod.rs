//! TLS certificate chain walking.
//!
//! This module opens a raw TLS connection to a host and reports the
//! certificate chain it presents:
//! - The host is resolved through the DoH lookup (never the OS resolver)
//! - Connect and handshake each run under a timeout
//! - The chain is ordered by issuer links, leaf first, with a cycle guard and depth bound
//!
//! Failures are classified as `dns_error`, `fetch_error`, `tls_error` or `timeout`.
//! Certificates are validated against the webpki roots, so an expired or
//! untrusted chain fails the handshake and surfaces as `tls_error`.

mod chain;
mod extract;
mod types;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use rustls::pki_types::ServerName;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

use crate::config::{MAX_CHAIN_DEPTH, TLS_CONNECT_TIMEOUT_SECS, TLS_SHUTDOWN_TIMEOUT};
use crate::dns::HostLookup;
use crate::error_handling::{categorize_io_error, ClassifiedError, ErrorKind};
use crate::providers::{ProviderCatalog, StaticCatalog};
use crate::security::is_public_ip;

// Re-export public API
pub use chain::walk_chain;
pub use types::{CertificateChain, CertificateNode};

use extract::node_from_der;

/// Default HTTPS port.
pub const DEFAULT_TLS_PORT: u16 = 443;

/// Builds a rustls client configuration trusting the webpki roots.
pub fn default_client_config() -> Arc<ClientConfig> {
    let mut root_store = RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();
    Arc::new(config)
}

/// Connects to hosts and walks the certificate chains they present.
#[derive(Clone)]
pub struct TlsWalker {
    lookup: Arc<dyn HostLookup>,
    config: Arc<ClientConfig>,
    timeout: Duration,
    catalog: Arc<dyn ProviderCatalog>,
}

impl TlsWalker {
    pub fn new(lookup: Arc<dyn HostLookup>) -> Self {
        Self {
            lookup,
            config: default_client_config(),
            timeout: Duration::from_secs(TLS_CONNECT_TIMEOUT_SECS),
            catalog: Arc::new(StaticCatalog),
        }
    }

    /// Sets the connect and handshake timeout (applied to each phase).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_config(mut self, config: Arc<ClientConfig>) -> Self {
        self.config = config;
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn ProviderCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Fetches the certificate chain presented by `host:port`.
    ///
    /// # Errors
    ///
    /// - `dns_error`: the host does not resolve to a public address
    /// - `fetch_error`: the TCP connection failed before a handshake
    /// - `tls_error`: the handshake or certificate validation failed
    /// - `timeout`: connect or handshake exceeded the timeout
    pub async fn fetch_chain(
        &self,
        host: &str,
        port: u16,
    ) -> Result<CertificateChain, ClassifiedError> {
        let host = host.trim_end_matches('.').to_lowercase();
        debug!("Attempting to fetch certificate chain for {host}:{port}");

        let server_name = ServerName::try_from(host.clone()).map_err(|e| {
            ClassifiedError::new(ErrorKind::DnsError, format!("invalid host name {host}: {e}"))
        })?;

        let addrs = self.public_addresses(&host).await?;
        let sock = self.connect(&host, port, &addrs).await?;

        let connector = TlsConnector::from(Arc::clone(&self.config));
        let mut tls_stream = match timeout(self.timeout, connector.connect(server_name, sock)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                let kind = categorize_io_error(&e);
                warn!("TLS handshake failed for {host}:{port} ({kind}): {e}");
                return Err(ClassifiedError::new(
                    kind,
                    format!("TLS handshake with {host}:{port} failed: {e}"),
                ));
            }
            Err(_) => {
                warn!("TLS handshake timeout for {host}:{port}");
                return Err(ClassifiedError::new(
                    ErrorKind::Timeout,
                    format!(
                        "TLS handshake with {host}:{port} timed out after {}s",
                        self.timeout.as_secs()
                    ),
                ));
            }
        };

        let (_, session) = tls_stream.get_ref();
        let tls_version = session.protocol_version().map(|v| format!("{v:?}"));
        let cipher_suite = session
            .negotiated_cipher_suite()
            .map(|cs| format!("{:?}", cs.suite()));
        let presented = session
            .peer_certificates()
            .map(|certs| {
                certs
                    .iter()
                    .map(|der| node_from_der(der.as_ref(), self.catalog.as_ref()))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose();

        // Close the connection before reporting, on success and parse failure alike.
        match timeout(TLS_SHUTDOWN_TIMEOUT, tls_stream.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("TLS shutdown for {host}:{port} failed: {e}"),
            Err(_) => debug!("TLS shutdown for {host}:{port} timed out"),
        }
        drop(tls_stream);

        let presented = presented?.unwrap_or_default();
        if presented.is_empty() {
            return Err(ClassifiedError::new(
                ErrorKind::TlsError,
                format!("{host}:{port} presented no certificates"),
            ));
        }

        let chain = walk_chain(&presented, MAX_CHAIN_DEPTH);
        debug!(
            "Walked {} of {} presented certificate(s) for {host}:{port}",
            chain.len(),
            presented.len()
        );

        Ok(CertificateChain {
            host,
            port,
            chain,
            tls_version,
            cipher_suite,
        })
    }

    /// Resolves `host` and keeps only public addresses.
    async fn public_addresses(&self, host: &str) -> Result<Vec<IpAddr>, ClassifiedError> {
        let resolved = match host.parse::<IpAddr>() {
            Ok(ip) => vec![ip],
            Err(_) => self.lookup.lookup_ip(host).await?,
        };
        let public: Vec<IpAddr> = resolved.into_iter().filter(|ip| is_public_ip(*ip)).collect();
        if public.is_empty() {
            return Err(ClassifiedError::new(
                ErrorKind::DnsError,
                format!("{host} has no public address"),
            ));
        }
        Ok(public)
    }

    /// Connects to the first reachable address.
    ///
    /// Every address gets its own connect timeout. The last failure is
    /// reported when none of them connects.
    async fn connect(
        &self,
        host: &str,
        port: u16,
        addrs: &[IpAddr],
    ) -> Result<TcpStream, ClassifiedError> {
        let mut last_error = None;
        for ip in addrs {
            let addr = SocketAddr::new(*ip, port);
            let error = match timeout(self.timeout, TcpStream::connect(addr)).await {
                Ok(Ok(sock)) => return Ok(sock),
                Ok(Err(e)) => {
                    debug!("Failed to connect to {host} at {addr}: {e}");
                    ClassifiedError::new(
                        categorize_io_error(&e),
                        format!("connect to {host} ({addr}) failed: {e}"),
                    )
                }
                Err(_) => {
                    warn!("TCP connection timeout for {host} at {addr}");
                    ClassifiedError::new(
                        ErrorKind::Timeout,
                        format!(
                            "TCP connect to {host} ({addr}) timed out after {}s",
                            self.timeout.as_secs()
                        ),
                    )
                }
            };
            last_error = Some(error);
        }
        Err(last_error.unwrap_or_else(|| {
            ClassifiedError::new(ErrorKind::FetchError, format!("no address to connect to for {host}"))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::DohResolver;
    use crate::config::EngineConfig;
    use async_trait::async_trait;

    struct FixedLookup(Result<Vec<IpAddr>, ClassifiedError>);

    #[async_trait]
    impl HostLookup for FixedLookup {
        async fn lookup_ip(&self, _host: &str) -> Result<Vec<IpAddr>, ClassifiedError> {
            self.0.clone()
        }
    }

    fn walker(answer: Result<Vec<IpAddr>, ClassifiedError>) -> TlsWalker {
        TlsWalker::new(Arc::new(FixedLookup(answer))).with_timeout(Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_unresolvable_host_is_dns_error() {
        let err = walker(Err(ClassifiedError::new(ErrorKind::DnsError, "NXDOMAIN")))
            .fetch_chain("nxdomain.example", DEFAULT_TLS_PORT)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DnsError);
    }

    #[tokio::test]
    async fn test_private_only_host_is_dns_error() {
        let err = walker(Ok(vec!["127.0.0.1".parse().unwrap()]))
            .fetch_chain("internal.example", DEFAULT_TLS_PORT)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DnsError);
    }

    #[tokio::test]
    async fn test_invalid_host_name_is_dns_error() {
        let err = walker(Ok(vec![]))
            .fetch_chain("bad host", DEFAULT_TLS_PORT)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DnsError);
    }

    #[tokio::test]
    async fn test_connect_moves_past_an_unreachable_address() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let walker = walker(Ok(vec![])).with_timeout(Duration::from_millis(200));

        // 10.255.255.1 either times out or is refused; either way the
        // loopback listener must still be tried.
        let addrs: Vec<IpAddr> = vec!["10.255.255.1".parse().unwrap(), "127.0.0.1".parse().unwrap()];
        let sock = walker.connect("multi.example", port, &addrs).await;
        assert!(sock.is_ok());
    }

    #[tokio::test]
    async fn test_connect_reports_last_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let walker = walker(Ok(vec![])).with_timeout(Duration::from_millis(500));
        let addrs: Vec<IpAddr> = vec!["127.0.0.1".parse().unwrap()];
        let err = walker.connect("closed.example", port, &addrs).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::FetchError);
    }

    fn live_walker() -> TlsWalker {
        let resolver = DohResolver::from_config(&EngineConfig::default()).unwrap();
        TlsWalker::new(Arc::new(resolver))
    }

    #[tokio::test]
    #[ignore] // Requires internet access
    async fn test_live_chain() {
        let chain = live_walker()
            .fetch_chain("example.com", DEFAULT_TLS_PORT)
            .await
            .unwrap();
        assert!(!chain.chain.is_empty());
        assert!(chain.earliest_expiry().is_some());
    }

    #[tokio::test]
    #[ignore] // Requires internet access
    async fn test_live_expired_certificate_is_tls_error() {
        let err = live_walker()
            .fetch_chain("expired.badssl.com", DEFAULT_TLS_PORT)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::TlsError);
    }
}

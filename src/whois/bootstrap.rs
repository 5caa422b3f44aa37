//! IANA RDAP bootstrap registry (RFC 9224), cached in memory.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};

use crate::config::{BOOTSTRAP_FAILURE_BACKOFF, BOOTSTRAP_MAX_BODY_BYTES};
use crate::error_handling::{categorize_reqwest_error, ClassifiedError, ErrorKind};
use crate::fetch::read_body_limited;

/// Wire shape of `dns.json`: `services` is a list of `[[tlds], [urls]]` pairs.
#[derive(Debug, Deserialize)]
struct BootstrapFile {
    services: Vec<(Vec<String>, Vec<String>)>,
}

/// TLD to RDAP base URLs.
#[derive(Debug, Clone, Default)]
pub struct Bootstrap {
    services: HashMap<String, Vec<String>>,
}

impl Bootstrap {
    /// Parses the IANA `dns.json` document.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let file: BootstrapFile = serde_json::from_slice(bytes)?;
        let mut services = HashMap::new();
        for (tlds, urls) in file.services {
            for tld in tlds {
                services.insert(tld.to_lowercase(), urls.clone());
            }
        }
        Ok(Self { services })
    }

    /// Base URLs for `tld`, HTTPS first.
    pub fn servers_for(&self, tld: &str) -> Option<Vec<String>> {
        let mut urls = self.services.get(&tld.to_lowercase())?.clone();
        urls.sort_by_key(|u| !u.starts_with("https://"));
        Some(urls)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

struct CachedBootstrap {
    bootstrap: Arc<Bootstrap>,
    fetched_at: Instant,
}

#[derive(Default)]
struct BootstrapState {
    current: Option<CachedBootstrap>,
    last_failure: Option<Instant>,
}

/// Long-lived bootstrap cache.
///
/// Lookups never wait on a download another task is running, and after a
/// failed download no new one starts until the failure backoff has passed.
/// In both cases the previous copy is served, or `None` when no copy was ever
/// fetched.
pub struct BootstrapCache {
    client: reqwest::Client,
    url: String,
    ttl: Duration,
    timeout: Duration,
    failure_backoff: Duration,
    state: RwLock<BootstrapState>,
    refresh: Mutex<()>,
}

impl BootstrapCache {
    pub fn new(client: reqwest::Client, url: impl Into<String>, ttl: Duration, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            ttl,
            timeout,
            failure_backoff: BOOTSTRAP_FAILURE_BACKOFF,
            state: RwLock::new(BootstrapState::default()),
            refresh: Mutex::new(()),
        }
    }

    /// Sets how long to wait after a failed download before trying again.
    pub fn with_failure_backoff(mut self, backoff: Duration) -> Self {
        self.failure_backoff = backoff;
        self
    }

    /// Returns the current bootstrap, refreshing it when older than the TTL.
    pub async fn get(&self) -> Option<Arc<Bootstrap>> {
        if let Some(answer) = self.without_download().await {
            return answer;
        }

        let Ok(_refreshing) = self.refresh.try_lock() else {
            debug!("RDAP bootstrap refresh already running, serving cached copy");
            return self.cached().await;
        };
        // A refresh may have finished between the check above and the lock.
        if let Some(answer) = self.without_download().await {
            return answer;
        }

        match self.download().await {
            Ok(bootstrap) => {
                debug!("Loaded RDAP bootstrap with {} TLDs", bootstrap.len());
                let bootstrap = Arc::new(bootstrap);
                let mut state = self.state.write().await;
                state.current = Some(CachedBootstrap {
                    bootstrap: Arc::clone(&bootstrap),
                    fetched_at: Instant::now(),
                });
                state.last_failure = None;
                Some(bootstrap)
            }
            Err(e) => {
                warn!("RDAP bootstrap refresh from {} failed: {}", self.url, e);
                let mut state = self.state.write().await;
                state.last_failure = Some(Instant::now());
                state.current.as_ref().map(|cached| Arc::clone(&cached.bootstrap))
            }
        }
    }

    /// `Some(answer)` when no download is due: the copy is fresh, or the last
    /// download failed within the backoff.
    async fn without_download(&self) -> Option<Option<Arc<Bootstrap>>> {
        let state = self.state.read().await;
        let cached = state.current.as_ref().map(|c| Arc::clone(&c.bootstrap));
        if state
            .current
            .as_ref()
            .is_some_and(|c| c.fetched_at.elapsed() < self.ttl)
        {
            return Some(cached);
        }
        if state
            .last_failure
            .is_some_and(|at| at.elapsed() < self.failure_backoff)
        {
            debug!("RDAP bootstrap download failed recently, not retrying yet");
            return Some(cached);
        }
        None
    }

    async fn cached(&self) -> Option<Arc<Bootstrap>> {
        let state = self.state.read().await;
        state.current.as_ref().map(|c| Arc::clone(&c.bootstrap))
    }

    async fn download(&self) -> Result<Bootstrap, ClassifiedError> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| categorize_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifiedError::new(
                ErrorKind::InvalidResponse,
                format!("bootstrap answered HTTP {}", status.as_u16()),
            )
            .with_status(status.as_u16()));
        }

        let body = read_body_limited(response, BOOTSTRAP_MAX_BODY_BYTES, false).await?;
        Bootstrap::from_json(&body.bytes).map_err(|e| {
            ClassifiedError::new(ErrorKind::InvalidResponse, format!("malformed bootstrap: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "version": "1.0",
        "publication": "2025-01-01T00:00:00Z",
        "services": [
            [["com", "net"], ["http://rdap.verisign.example/", "https://rdap.verisign.example/com/v1/"]],
            [["ORG"], ["https://rdap.pir.example/"]]
        ]
    }"#;

    #[test]
    fn test_bootstrap_maps_tlds() {
        let bootstrap = Bootstrap::from_json(SAMPLE.as_bytes()).unwrap();
        assert_eq!(bootstrap.len(), 3);
        assert_eq!(
            bootstrap.servers_for("org"),
            Some(vec!["https://rdap.pir.example/".to_string()])
        );
        assert!(bootstrap.servers_for("zz").is_none());
    }

    #[test]
    fn test_bootstrap_prefers_https() {
        let bootstrap = Bootstrap::from_json(SAMPLE.as_bytes()).unwrap();
        let servers = bootstrap.servers_for("COM").unwrap();
        assert_eq!(servers[0], "https://rdap.verisign.example/com/v1/");
    }

    #[test]
    fn test_bootstrap_rejects_malformed() {
        assert!(Bootstrap::from_json(b"{\"services\": 3}").is_err());
    }
}

//! The guarded client ignores proxy settings from the environment.
//!
//! Kept in its own test binary because it sets process-wide variables.

mod helpers;

use std::sync::Arc;

use domain_intel::dns::HostLookup;
use domain_intel::fetch::{FetchOptions, Fetcher};
use domain_intel::initialization::init_guarded_client;
use domain_intel::security::GuardPolicy;
use domain_intel::EngineConfig;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use helpers::{LoopbackGuard, StaticLookup};

#[tokio::test]
async fn test_guarded_client_bypasses_environment_proxy() {
    let origin = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("direct"))
        .mount(&origin)
        .await;
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("proxied"))
        .mount(&proxy)
        .await;

    std::env::set_var("HTTP_PROXY", proxy.uri());
    std::env::set_var("http_proxy", proxy.uri());
    std::env::remove_var("NO_PROXY");
    std::env::remove_var("no_proxy");

    let lookup: Arc<dyn HostLookup> = Arc::new(StaticLookup::default());
    let client = init_guarded_client(&EngineConfig::default(), Arc::clone(&lookup))
        .expect("client builds");
    let fetcher = Fetcher::new(client, Arc::new(LoopbackGuard::new(&origin.uri(), lookup)));

    let options = FetchOptions::default().guard(GuardPolicy::default().allow_http(true));
    let response = fetcher
        .fetch(&format!("{}/", origin.uri()), &options)
        .await
        .expect("direct fetch");

    assert_eq!(response.text(), "direct");
    let proxied = proxy.received_requests().await.unwrap_or_default();
    assert!(proxied.is_empty());
}

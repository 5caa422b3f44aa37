//! Fetcher behavior against mock servers.
//!
//! These tests verify the redirect and byte-ceiling handling of the guarded
//! fetcher, including:
//! - Redirects to cloud metadata addresses are refused before any request
//! - Redirect limit enforcement
//! - Body ceilings (rejection and exact truncation)
//! - HEAD to GET fallback on 405
//! - Connection-time re-resolution (DNS rebinding)
//! - TLS negotiation failures reported as retryable fetch errors

mod helpers;

use std::net::IpAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use domain_intel::dns::HostLookup;
use domain_intel::error_handling::{classify, ErrorKind};
use domain_intel::fetch::{FetchMethod, FetchOptions, Fetcher};
use domain_intel::initialization::init_guarded_client;
use domain_intel::security::{GuardPolicy, HostGuard};
use domain_intel::EngineConfig;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use helpers::{LoopbackGuard, RebindingLookup, StaticLookup};

fn http_options() -> FetchOptions {
    FetchOptions::default().guard(GuardPolicy::default().allow_http(true))
}

fn mock_fetcher(server: &MockServer) -> Fetcher {
    let lookup: Arc<dyn HostLookup> = Arc::new(StaticLookup::default());
    let client = init_guarded_client(&EngineConfig::default(), Arc::clone(&lookup))
        .expect("client builds");
    Fetcher::new(client, Arc::new(LoopbackGuard::new(&server.uri(), lookup)))
}

async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|r| r.len())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_redirect_to_metadata_address_is_refused() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", "http://169.254.169.254/latest/meta-data/"),
        )
        .mount(&server)
        .await;

    let err = mock_fetcher(&server)
        .fetch(&format!("{}/", server.uri()), &http_options())
        .await
        .expect_err("metadata redirect must be refused");

    assert_eq!(err.kind, ErrorKind::PrivateIp);
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_redirect_chain_records_hops() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/b"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(307).insert_header("location", "/c"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/c"))
        .respond_with(ResponseTemplate::new(200).set_body_string("done"))
        .mount(&server)
        .await;

    let response = mock_fetcher(&server)
        .fetch(&format!("{}/a", server.uri()), &http_options())
        .await
        .expect("chain within the limit succeeds");

    assert_eq!(response.status, 200);
    assert_eq!(response.final_url, format!("{}/c", server.uri()));
    assert_eq!(response.text(), "done");
    let hops: Vec<(usize, u16)> = response.redirects.iter().map(|h| (h.index, h.status)).collect();
    assert_eq!(hops, vec![(1, 301), (2, 307)]);
}

#[tokio::test]
async fn test_redirect_limit_is_enforced() {
    let server = MockServer::start().await;
    for i in 0..5 {
        Mock::given(method("GET"))
            .and(path(format!("/r{i}")))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", format!("/r{}", i + 1)),
            )
            .mount(&server)
            .await;
    }

    let err = mock_fetcher(&server)
        .fetch(
            &format!("{}/r0", server.uri()),
            &http_options().max_redirects(3),
        )
        .await
        .expect_err("fourth redirect exceeds the limit");

    assert_eq!(err.kind, ErrorKind::RedirectLimit);
    // The original request plus three followed hops.
    assert_eq!(request_count(&server).await, 4);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 2000]))
        .mount(&server)
        .await;

    let err = mock_fetcher(&server)
        .fetch(&server.uri(), &http_options().max_bytes(1000))
        .await
        .expect_err("body over the ceiling");

    assert_eq!(err.kind, ErrorKind::SizeExceeded);
}

#[tokio::test]
async fn test_truncation_stops_exactly_at_ceiling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 2000]))
        .mount(&server)
        .await;

    let response = mock_fetcher(&server)
        .fetch(
            &server.uri(),
            &http_options().max_bytes(1000).allow_truncation(true),
        )
        .await
        .expect("truncation allowed");

    assert_eq!(response.body.len(), 1000);
    assert!(response.truncated);
}

#[tokio::test]
async fn test_body_at_ceiling_is_not_truncated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 1000]))
        .mount(&server)
        .await;

    let response = mock_fetcher(&server)
        .fetch(&server.uri(), &http_options().max_bytes(1000))
        .await
        .expect("body fits");

    assert_eq!(response.body.len(), 1000);
    assert!(!response.truncated);
}

#[tokio::test]
async fn test_head_falls_back_to_get_on_405() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-served-by", "mock")
                .set_body_string("<html></html>"),
        )
        .mount(&server)
        .await;

    let options = FetchOptions::head().guard(GuardPolicy::default().allow_http(true));
    let response = mock_fetcher(&server)
        .fetch(&server.uri(), &options)
        .await
        .expect("fallback succeeds");

    assert_eq!(response.status, 200);
    assert_eq!(response.method, FetchMethod::Get);
    assert_eq!(response.header("x-served-by"), Some("mock"));
}

#[tokio::test]
async fn test_error_status_is_a_result_not_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&server)
        .await;

    let response = mock_fetcher(&server)
        .fetch(&server.uri(), &http_options())
        .await
        .expect("4xx is returned to the caller");

    assert_eq!(response.status, 404);
    assert!(!response.is_success());
}

#[tokio::test]
async fn test_plain_http_requires_opt_in() {
    let server = MockServer::start().await;

    let err = mock_fetcher(&server)
        .fetch(&server.uri(), &FetchOptions::default())
        .await
        .expect_err("http is refused by default");

    assert_eq!(err.kind, ErrorKind::ProtocolNotAllowed);
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn test_rebinding_between_guard_and_connect_is_refused() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let port = server.address().port();

    let lookup: Arc<dyn HostLookup> = Arc::new(RebindingLookup {
        public: "93.184.216.34".parse::<IpAddr>().expect("ip"),
        private: "127.0.0.1".parse::<IpAddr>().expect("ip"),
        calls: AtomicUsize::new(0),
    });
    let client = init_guarded_client(&EngineConfig::default(), Arc::clone(&lookup))
        .expect("client builds");
    let fetcher = Fetcher::new(client, Arc::new(HostGuard::new(lookup)));

    let err = fetcher
        .fetch(&format!("http://rebind.test:{port}/"), &http_options())
        .await
        .expect_err("second answer is private");

    assert_eq!(err.kind, ErrorKind::PrivateIp);
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn test_failed_tls_negotiation_is_retryable_fetch_error() {
    // The mock speaks plain HTTP, so an https:// request fails during the handshake.
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let url = format!("https://127.0.0.1:{}/", server.address().port());
    let err = mock_fetcher(&server)
        .fetch(&url, &FetchOptions::default())
        .await
        .expect_err("handshake fails");

    assert_eq!(err.kind, ErrorKind::FetchError);
    assert!(!classify(&err, 0).is_fatal());
}

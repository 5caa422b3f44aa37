//! domain_intel library: acquisition of facts about untrusted domains
//!
//! This library acquires DNS records, TLS certificate chains, RDAP registration
//! data, HTTP response headers and SEO metadata for domains supplied by
//! untrusted users. Every outbound request to a user-derived host is checked
//! by an SSRF guard that resolves the host over DNS-over-HTTPS and rejects any
//! non-public address, again on every redirect hop.
//!
//! The acquisition [`Engine`] is built to be driven by a durable step runtime:
//! each `domain:kind` step is idempotent, failures come back classified as
//! fatal or retryable (with a delay), and results are stored with an expiry
//! so stale data can be served while it is refreshed.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use domain_intel::{ArtifactKind, Engine, EngineConfig, MemoryStore, StepOutcome};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Engine::from_config(&EngineConfig::default(), Arc::new(MemoryStore::new()))?;
//!
//! match engine.revalidate("example.com", ArtifactKind::Dns, 0).await {
//!     StepOutcome::Completed { expires_at, .. } => println!("fresh until {expires_at}"),
//!     StepOutcome::Retry { retry_after, .. } => println!("retry in {retry_after:?}"),
//!     StepOutcome::Fatal { error } => println!("gave up: {error}"),
//! }
//!
//! let cached = engine.read("example.com", ArtifactKind::Dns).await?;
//! println!("stale: {:?}", cached.map(|c| c.stale));
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod acquire;
pub mod cache;
pub mod config;
pub mod dns;
pub mod domain;
pub mod error_handling;
pub mod fetch;
pub mod initialization;
pub mod providers;
pub mod security;
pub mod tls;
pub mod whois;

// Re-export public API
pub use acquire::{
    Artifact, ArtifactKind, ArtifactStore, Engine, MemoryStore, RevalidationScheduler, StepOutcome,
};
pub use config::{DohProvider, EngineConfig, LogFormat, LogLevel};
pub use domain::normalize_domain;
pub use error_handling::{classify, ClassifiedError, ErrorKind, RetryDecision};

//! Engine initialization and resource setup.
//!
//! This module provides functions to initialize shared resources:
//! - HTTP clients (DoH, guarded fetch, RDAP)
//! - Logger
//! - TLS crypto provider
//!
//! All initialization functions return proper error types for error handling.

mod client;
mod logger;

use rustls::crypto::{ring::default_provider, CryptoProvider};

// Re-export public API
pub use client::{init_doh_client, init_guarded_client, init_rdap_client};
pub use logger::init_logger_with;

/// Initializes the crypto provider for TLS operations.
///
/// Configures the global crypto provider for `rustls`. This must be called before
/// the TLS walker builds its client configuration.
pub fn init_crypto_provider() {
    // The return value is ignored because reinstalling the provider is harmless
    let _ = CryptoProvider::install_default(default_provider());
}

//! Host/IP guard and SSRF protection.
//!
//! This module keeps user-influenced requests away from internal networks:
//! - URL checks before each request and each redirect hop ([`UrlGuard`])
//! - A fail-closed public-address classifier ([`is_public_ip`])
//! - A connection-time reqwest resolver that re-checks every address ([`SafeResolver`])

mod guard;
mod ip;
mod safe_resolver;

// Re-export public API
pub use guard::{check_static, ensure_all_public, parse_target, GuardPolicy, HostGuard, UrlGuard};
pub use ip::{is_public_ip, AddressFamily, ResolvedAddress};
pub use safe_resolver::SafeResolver;

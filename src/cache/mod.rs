//! Artifact freshness and request coalescing.
//!
//! Readers always get the last-known-good artifact with a `stale` flag;
//! staleness triggers revalidation, it never blocks a read.

mod inflight;
mod policy;
mod types;

// Re-export public API
pub use inflight::InflightCoalescer;
pub use policy::{is_stale, lifetime_for, ttl_for, TtlHint};
pub use types::{ArtifactKind, CachedArtifact};

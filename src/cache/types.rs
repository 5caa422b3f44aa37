//! Cached artifact shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumIter, EnumString};

/// The kinds of artifact the engine acquires.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ArtifactKind {
    Dns,
    Registration,
    Certificates,
    Headers,
    Seo,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// A payload with its freshness window.
///
/// Read-only once written; the next successful fetch replaces it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedArtifact<T> {
    pub data: T,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// `now >= expires_at` at the time the artifact was read
    pub stale: bool,
}

impl<T> CachedArtifact<T> {
    /// Wraps `data`, computing the stale flag against `now`.
    pub fn new(
        data: T,
        fetched_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            data,
            fetched_at,
            expires_at,
            stale: super::is_stale(expires_at, now),
        }
    }
}

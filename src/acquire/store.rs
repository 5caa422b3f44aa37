//! Persistence and scheduling collaborators.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::types::Artifact;
use crate::cache::ArtifactKind;
use crate::error_handling::StoreError;

/// A stored artifact and its freshness window.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredArtifact {
    pub artifact: Artifact,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Persistence collaborator. Owns its schema; the engine only replaces and reads.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Returns the id for `name`, creating the record when missing.
    async fn ensure_domain_record(&self, name: &str) -> Result<u64, StoreError>;

    /// Replaces (never merges) the stored artifact of `artifact.kind()`.
    async fn replace_artifact(
        &self,
        domain_id: u64,
        artifact: Artifact,
        fetched_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn get_cached(
        &self,
        domain_id: u64,
        kind: ArtifactKind,
    ) -> Result<Option<StoredArtifact>, StoreError>;
}

/// Receives out-of-band revalidation requests for stale artifacts.
///
/// Must not block: implementations enqueue and return.
pub trait RevalidationScheduler: Send + Sync {
    fn request_revalidation(&self, domain: &str, kind: ArtifactKind);
}

#[derive(Default)]
struct MemoryState {
    ids: HashMap<String, u64>,
    artifacts: HashMap<(u64, ArtifactKind), StoredArtifact>,
}

/// In-process store, used by the CLI and tests.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn ensure_domain_record(&self, name: &str) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        let next = state.ids.len() as u64 + 1;
        Ok(*state.ids.entry(name.to_string()).or_insert(next))
    }

    async fn replace_artifact(
        &self,
        domain_id: u64,
        artifact: Artifact,
        fetched_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if !state.ids.values().any(|id| *id == domain_id) {
            return Err(StoreError::UnknownDomain(domain_id));
        }
        state.artifacts.insert(
            (domain_id, artifact.kind()),
            StoredArtifact {
                artifact,
                fetched_at,
                expires_at,
            },
        );
        Ok(())
    }

    async fn get_cached(
        &self,
        domain_id: u64,
        kind: ArtifactKind,
    ) -> Result<Option<StoredArtifact>, StoreError> {
        let state = self.state.read().await;
        Ok(state.artifacts.get(&(domain_id, kind)).cloned())
    }
}

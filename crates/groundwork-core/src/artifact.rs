//! Artifact storage abstraction.
//!
//! Artifacts are immutable bundles passed between pipeline stages, held in
//! the stack's artifact bucket (or an in-memory stand-in under test).

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::RunId;
use crate::Result;

/// Key for storing/retrieving an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
    /// Pipeline run this artifact belongs to.
    pub run_id: RunId,
    /// Stage that produced it.
    pub stage: String,
    /// Artifact name.
    pub name: String,
}

/// Reference to a stored artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub key: ArtifactKey,
    /// Content hash for integrity.
    pub checksum: String,
    /// Size in bytes.
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

/// Trait for artifact storage backends.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store an artifact.
    async fn put(&self, key: &ArtifactKey, data: Bytes) -> Result<ArtifactRef>;

    /// Retrieve an artifact.
    async fn get(&self, reference: &ArtifactRef) -> Result<Bytes>;

    /// List artifacts for a pipeline run.
    async fn list(&self, run_id: &RunId) -> Result<Vec<ArtifactRef>>;

    /// Delete an artifact.
    async fn delete(&self, reference: &ArtifactRef) -> Result<()>;
}

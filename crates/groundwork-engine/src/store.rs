//! In-memory artifact store backing pipeline runs under test and dry runs.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use sha2::{Digest, Sha256};

use groundwork_core::artifact::{ArtifactKey, ArtifactRef, ArtifactStore};
use groundwork_core::id::RunId;
use groundwork_core::{Error, Result};

/// Artifact store holding everything in process memory.
#[derive(Default)]
pub struct MemoryArtifactStore {
    artifacts: Mutex<HashMap<ArtifactKey, (Bytes, ArtifactRef)>>,
}

impl MemoryArtifactStore {
    pub fn artifact_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ArtifactKey, (Bytes, ArtifactRef)>> {
        match self.artifacts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(&self, key: &ArtifactKey, data: Bytes) -> Result<ArtifactRef> {
        let checksum = hex::encode(Sha256::digest(&data));
        let reference = ArtifactRef {
            key: key.clone(),
            checksum,
            size: data.len() as u64,
            created_at: Utc::now(),
        };
        self.lock()
            .insert(key.clone(), (data, reference.clone()));
        Ok(reference)
    }

    async fn get(&self, reference: &ArtifactRef) -> Result<Bytes> {
        self.lock()
            .get(&reference.key)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| Error::NotFound(format!("artifact {:?}", reference.key)))
    }

    async fn list(&self, run_id: &RunId) -> Result<Vec<ArtifactRef>> {
        Ok(self
            .lock()
            .values()
            .filter(|(_, r)| &r.key.run_id == run_id)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn delete(&self, reference: &ArtifactRef) -> Result<()> {
        self.lock()
            .remove(&reference.key)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("artifact {:?}", reference.key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(run_id: RunId, stage: &str) -> ArtifactKey {
        ArtifactKey {
            run_id,
            stage: stage.to_string(),
            name: "bundle.zip".to_string(),
        }
    }

    #[tokio::test]
    async fn checksums_are_stable_for_identical_content() {
        let store = MemoryArtifactStore::default();
        let run = RunId::new();
        let a = store
            .put(&key(run.clone(), "source"), Bytes::from_static(b"payload"))
            .await
            .unwrap();
        let b = store
            .put(&key(run, "build"), Bytes::from_static(b"payload"))
            .await
            .unwrap();
        assert_eq!(a.checksum, b.checksum);
        assert_eq!(a.size, 7);
    }

    #[tokio::test]
    async fn list_scopes_to_one_run() {
        let store = MemoryArtifactStore::default();
        let first = RunId::new();
        let second = RunId::new();
        store
            .put(&key(first.clone(), "source"), Bytes::from_static(b"a"))
            .await
            .unwrap();
        store
            .put(&key(second, "source"), Bytes::from_static(b"b"))
            .await
            .unwrap();
        assert_eq!(store.list(&first).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn getting_a_deleted_artifact_is_not_found() {
        let store = MemoryArtifactStore::default();
        let reference = store
            .put(&key(RunId::new(), "source"), Bytes::from_static(b"a"))
            .await
            .unwrap();
        store.delete(&reference).await.unwrap();
        assert!(matches!(
            store.get(&reference).await.unwrap_err(),
            Error::NotFound(_)
        ));
    }
}

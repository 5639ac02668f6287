//! In-memory artifact store.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::ArtifactStore;
use crate::core::{Artifact, ArtifactKey};
use crate::errors::StoreError;

/// Keeps artifacts in a concurrent map. Useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    entries: DashMap<ArtifactKey, String>,
    writes: AtomicUsize,
}

impl MemoryArtifactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total writes performed, overwrites included.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Returns a stored artifact's content.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .get(&ArtifactKey::new(key))
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    fn contains_nonempty(&self, key: &ArtifactKey) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.value().is_empty())
    }

    fn write(&self, artifact: &Artifact) -> Result<(), StoreError> {
        self.entries
            .insert(artifact.key.clone(), artifact.content.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn load(&self, key: &ArtifactKey) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn keys(&self) -> Result<Vec<ArtifactKey>, StoreError> {
        let mut keys: Vec<_> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        Ok(keys)
    }
}

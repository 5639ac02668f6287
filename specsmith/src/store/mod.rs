//! Artifact storage.
//!
//! This module provides:
//! - The `ArtifactStore` trait
//! - A filesystem store with atomic writes
//! - An in-memory store
//! - `ResumableStore`, which adds skip-existing and write-once-per-run rules

mod fs;
mod memory;
mod resumable;

pub use fs::FsArtifactStore;
pub use memory::MemoryArtifactStore;
pub use resumable::{PersistOutcome, ResumableStore};

pub use crate::errors::StoreError;

use async_trait::async_trait;

use crate::core::{Artifact, ArtifactKey};

/// Protocol for artifact storage backends.
///
/// Pipelines persist through [`write_async`](ArtifactStore::write_async)
/// from worker futures polled on the dispatching task, so a store doing
/// blocking I/O must override it to keep that task free.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// True if `key` holds an artifact with non-empty content.
    fn contains_nonempty(&self, key: &ArtifactKey) -> bool;

    /// Writes an artifact, replacing any previous content.
    fn write(&self, artifact: &Artifact) -> Result<(), StoreError>;

    /// Writes an artifact without blocking the calling task.
    async fn write_async(&self, artifact: &Artifact) -> Result<(), StoreError> {
        self.write(artifact)
    }

    /// Reads an artifact, or `None` if absent.
    fn load(&self, key: &ArtifactKey) -> Result<Option<String>, StoreError>;

    /// Lists every stored key, sorted.
    fn keys(&self) -> Result<Vec<ArtifactKey>, StoreError>;
}

//! Skip-existing bookkeeping on top of an artifact store.

use parking_lot::Mutex;
use std::collections::HashSet;
use tracing::debug;

use super::ArtifactStore;
use crate::core::{Artifact, ArtifactKey, ArtifactTarget};
use crate::errors::StoreError;

/// What happened to an artifact handed to [`ResumableStore::persist`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// The artifact was written.
    Written,
    /// The content was empty, nothing was written.
    SkippedEmpty,
    /// The key was already written during this run.
    AlreadyWritten,
}

/// Makes batch runs resumable.
///
/// With skip-existing enabled, items whose artifact already exists with
/// non-empty content are skipped, and each key is written at most once per
/// run. With it disabled every item is regenerated and overwritten.
#[derive(Debug)]
pub struct ResumableStore<S> {
    inner: S,
    skip_existing: bool,
    written: Mutex<HashSet<ArtifactKey>>,
}

impl<S: ArtifactStore> ResumableStore<S> {
    /// Wraps a store.
    #[must_use]
    pub fn new(inner: S, skip_existing: bool) -> Self {
        Self {
            inner,
            skip_existing,
            written: Mutex::new(HashSet::new()),
        }
    }

    /// The wrapped store.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Unwraps the store, ending the run.
    #[must_use]
    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Whether skip-existing is enabled.
    #[must_use]
    pub fn skip_existing(&self) -> bool {
        self.skip_existing
    }

    /// True if the artifact `target` derives for `item` can be skipped.
    pub fn should_skip<I: ?Sized>(&self, item: &I, target: &dyn ArtifactTarget<I>) -> bool {
        self.should_skip_key(&target.artifact_key(item))
    }

    /// True if `key` already holds a non-empty artifact and skipping is on.
    pub fn should_skip_key(&self, key: &ArtifactKey) -> bool {
        self.skip_existing && self.inner.contains_nonempty(key)
    }

    /// Persists an artifact unless it is empty or already written this run.
    pub fn persist(&self, artifact: &Artifact) -> Result<PersistOutcome, StoreError> {
        if let Some(outcome) = self.claim(artifact) {
            return Ok(outcome);
        }
        let written = self.inner.write(artifact);
        self.settle(artifact, written)
    }

    /// Like [`persist`](Self::persist), writing through the store's
    /// non-blocking path.
    pub async fn persist_async(&self, artifact: &Artifact) -> Result<PersistOutcome, StoreError> {
        if let Some(outcome) = self.claim(artifact) {
            return Ok(outcome);
        }
        let written = self.inner.write_async(artifact).await;
        self.settle(artifact, written)
    }

    /// Reserves the key for this run, or says why nothing should be written.
    fn claim(&self, artifact: &Artifact) -> Option<PersistOutcome> {
        if artifact.is_empty() {
            debug!(key = %artifact.key, "Empty artifact not persisted");
            return Some(PersistOutcome::SkippedEmpty);
        }

        if self.skip_existing && !self.written.lock().insert(artifact.key.clone()) {
            debug!(key = %artifact.key, "Artifact already written this run");
            return Some(PersistOutcome::AlreadyWritten);
        }
        None
    }

    fn settle(
        &self,
        artifact: &Artifact,
        written: Result<(), StoreError>,
    ) -> Result<PersistOutcome, StoreError> {
        if let Err(e) = written {
            self.written.lock().remove(&artifact.key);
            return Err(e);
        }
        if !self.skip_existing {
            self.written.lock().insert(artifact.key.clone());
        }
        Ok(PersistOutcome::Written)
    }

    /// Keys written during this run, sorted.
    #[must_use]
    pub fn written_keys(&self) -> Vec<ArtifactKey> {
        let mut keys: Vec<_> = self.written.lock().iter().cloned().collect();
        keys.sort();
        keys
    }

    /// Loads an artifact from the wrapped store.
    pub fn load(&self, key: &ArtifactKey) -> Result<Option<String>, StoreError> {
        self.inner.load(key)
    }

    /// Lists keys in the wrapped store.
    pub fn keys(&self) -> Result<Vec<ArtifactKey>, StoreError> {
        self.inner.keys()
    }
}

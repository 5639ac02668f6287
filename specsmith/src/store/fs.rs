//! Filesystem artifact store with atomic writes.

use async_trait::async_trait;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use super::ArtifactStore;
use crate::core::{Artifact, ArtifactKey};
use crate::errors::StoreError;

/// Stores artifacts as files under a root directory.
///
/// Keys are relative paths. Each write goes to a temporary file in the target
/// directory which is synced and then renamed over the destination, so a
/// crash never leaves a half-written artifact behind. The async write path
/// runs on tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Creates a store rooted at `root`. The directory is created on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a key to a path inside the root.
    pub fn path_for(&self, key: &ArtifactKey) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key.as_str());
        if key.as_str().trim().is_empty() {
            return Err(StoreError::invalid_key(key.as_str(), "key is empty"));
        }
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir => {
                    return Err(StoreError::invalid_key(key.as_str(), "key escapes the store root"))
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(StoreError::invalid_key(key.as_str(), "key must be relative"))
                }
            }
        }
        Ok(self.root.join(relative))
    }

    fn collect_keys(dir: &Path, prefix: &str, keys: &mut Vec<ArtifactKey>) -> std::io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let key = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}/{name}")
            };
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                Self::collect_keys(&entry.path(), &key, keys)?;
            } else if file_type.is_file() {
                keys.push(ArtifactKey::new(key));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    fn contains_nonempty(&self, key: &ArtifactKey) -> bool {
        self.path_for(key)
            .and_then(|path| fs::metadata(path).map_err(|e| StoreError::io(key.as_str(), e)))
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false)
    }

    fn write(&self, artifact: &Artifact) -> Result<(), StoreError> {
        let path = self.path_for(&artifact.key)?;
        write_atomic(&self.root, &path, artifact)
    }

    async fn write_async(&self, artifact: &Artifact) -> Result<(), StoreError> {
        let path = self.path_for(&artifact.key)?;
        let root = self.root.clone();
        let owned = artifact.clone();
        tokio::task::spawn_blocking(move || write_atomic(&root, &path, &owned))
            .await
            .map_err(|e| StoreError::io(artifact.key.as_str(), std::io::Error::other(e)))?
    }

    fn load(&self, key: &ArtifactKey) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(key.as_str(), e)),
        }
    }

    fn keys(&self) -> Result<Vec<ArtifactKey>, StoreError> {
        let mut keys = Vec::new();
        match Self::collect_keys(&self.root, "", &mut keys) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(self.root.display().to_string(), e)),
        }
        keys.sort();
        Ok(keys)
    }
}

fn write_atomic(root: &Path, path: &Path, artifact: &Artifact) -> Result<(), StoreError> {
    let key = artifact.key.as_str();
    let parent = path.parent().unwrap_or(root);

    fs::create_dir_all(parent).map_err(|e| StoreError::io(key, e))?;

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| StoreError::io(key, e))?;
    temp.write_all(artifact.content.as_bytes())
        .map_err(|e| StoreError::io(key, e))?;
    temp.as_file().sync_all().map_err(|e| StoreError::io(key, e))?;
    temp.persist(path).map_err(|e| StoreError::io(key, e.error))?;

    debug!(key, bytes = artifact.content.len(), "Artifact written");
    Ok(())
}

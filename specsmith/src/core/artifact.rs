//! Persisted artifacts and how work items map onto them.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::target::TargetSpec;
use super::work_item::WorkItem;

/// Location of an artifact inside a store, as a relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactKey(String);

impl ArtifactKey {
    /// Creates a key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArtifactKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ArtifactKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ArtifactKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// A unit of persisted output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Where it is stored.
    pub key: ArtifactKey,
    /// The stored text.
    pub content: String,
}

impl Artifact {
    /// Creates an artifact.
    #[must_use]
    pub fn new(key: impl Into<ArtifactKey>, content: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            content: content.into(),
        }
    }

    /// Whitespace-only content counts as empty and is never persisted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Derives the artifact key a work item is persisted under.
pub trait ArtifactTarget<I: ?Sized>: Send + Sync {
    /// The key for `item`.
    fn artifact_key(&self, item: &I) -> ArtifactKey;
}

/// Test-spec documents: `{language}__{safe_id}.json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecFiles;

impl<I: WorkItem + ?Sized> ArtifactTarget<I> for SpecFiles {
    fn artifact_key(&self, item: &I) -> ArtifactKey {
        ArtifactKey(format!("{}.json", item.key()))
    }
}

/// Rendered test files for one target.
#[derive(Debug, Clone)]
pub struct TestFiles(pub TargetSpec);

impl<I: WorkItem + ?Sized> ArtifactTarget<I> for TestFiles {
    fn artifact_key(&self, item: &I) -> ArtifactKey {
        ArtifactKey(self.0.file_name(&item.key().id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ApiSymbol, SymbolKind};
    use pretty_assertions::assert_eq;

    fn symbol() -> ApiSymbol {
        ApiSymbol::new("add", "calc.ops.add", SymbolKind::Function, "go", "ops.go")
    }

    #[test]
    fn test_spec_file_key() {
        assert_eq!(
            SpecFiles.artifact_key(&symbol()).as_str(),
            "go__calc__ops__add.json"
        );
    }

    #[test]
    fn test_test_file_key() {
        let target = TestFiles(TargetSpec::new("go", "testing"));
        assert_eq!(
            target.artifact_key(&symbol()).as_str(),
            "test_calc__ops__add_test.go"
        );
    }

    #[test]
    fn test_whitespace_artifact_is_empty() {
        assert!(Artifact::new("a.txt", " \n\t").is_empty());
        assert!(!Artifact::new("a.txt", "x").is_empty());
    }
}

//! Work item identity.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Deterministic identity of a work item.
///
/// Used both for resumability checks and for artifact naming, so it must be
/// stable across runs for the same input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkKey {
    /// Grouping namespace, usually the source language.
    pub namespace: String,
    /// File-name safe identifier within the namespace.
    pub id: String,
}

impl WorkKey {
    /// Creates a new key.
    #[must_use]
    pub fn new(namespace: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for WorkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}__{}", self.namespace, self.id)
    }
}

/// An input unit of a generation stage.
pub trait WorkItem: Send + Sync {
    /// The item's deterministic key.
    fn key(&self) -> WorkKey;
}

impl<T: WorkItem + ?Sized> WorkItem for &T {
    fn key(&self) -> WorkKey {
        (**self).key()
    }
}

/// Finds items whose key was already derived by an earlier item.
///
/// Returns `(index, first)` pairs in submission order, where `first` is the
/// position of the earliest item with the same key. The earliest occurrence
/// is never reported.
pub fn find_duplicate_keys<I: WorkItem>(items: &[I]) -> Vec<(usize, usize)> {
    let mut first_seen: HashMap<WorkKey, usize> = HashMap::with_capacity(items.len());
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match first_seen.get(&item.key()) {
            Some(&first) => Some((index, first)),
            None => {
                first_seen.insert(item.key(), index);
                None
            }
        })
        .collect()
}

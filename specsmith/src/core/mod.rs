//! Core domain model types for specsmith.
//!
//! This module contains the fundamental types used throughout the crate:
//! - API symbol descriptors
//! - Work item identity and key uniqueness
//! - Rendering targets and their file naming
//! - Artifacts and artifact key derivation

mod artifact;
mod symbol;
mod target;
mod work_item;

pub use artifact::{Artifact, ArtifactKey, ArtifactTarget, SpecFiles, TestFiles};
pub use symbol::{ApiSymbol, SymbolKind};
pub use target::TargetSpec;
pub use work_item::{find_duplicate_keys, WorkItem, WorkKey};

//! Public API symbol descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::work_item::{WorkItem, WorkKey};

/// The kind of an API symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// A free function.
    Function,
    /// A class, struct or other nominal type.
    Class,
    /// A method bound to a type.
    Method,
    /// Anything the discovery layer could not classify.
    #[serde(other)]
    Other,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Method => "method",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// A symbol of the public API surface under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSymbol {
    /// The short name.
    pub name: String,

    /// The fully qualified name, e.g. `pkg.module.Type.method`.
    #[serde(alias = "qualifiedName")]
    pub qualified_name: String,

    /// What kind of symbol this is.
    pub kind: SymbolKind,

    /// Source language, lower-case.
    pub language: String,

    /// Path of the defining file.
    #[serde(alias = "filePath")]
    pub file_path: String,

    /// Declared signature, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    /// Doc comment, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
}

impl ApiSymbol {
    /// Creates a new symbol descriptor.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        qualified_name: impl Into<String>,
        kind: SymbolKind,
        language: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            qualified_name: qualified_name.into(),
            kind,
            language: language.into(),
            file_path: file_path.into(),
            signature: None,
            docstring: None,
        }
    }

    /// Sets the signature.
    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Sets the docstring.
    #[must_use]
    pub fn with_docstring(mut self, docstring: impl Into<String>) -> Self {
        self.docstring = Some(docstring.into());
        self
    }

    /// The qualified name made safe for file names.
    #[must_use]
    pub fn safe_id(&self) -> String {
        self.qualified_name
            .replace('.', "__")
            .replace(':', "__")
            .replace(' ', "_")
    }
}

impl WorkItem for ApiSymbol {
    fn key(&self) -> WorkKey {
        WorkKey::new(&self.language, self.safe_id())
    }
}

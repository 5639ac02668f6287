//! Testing utilities.
//!
//! This module provides:
//! - A scripted completion backend for driving the client and pipelines
//!   without a network
//! - Symbol fixtures

mod backend;

pub use backend::ScriptedBackend;

use crate::core::{ApiSymbol, SymbolKind};

/// A function symbol with a signature, for tests and examples.
#[must_use]
pub fn function_symbol(language: &str, qualified_name: &str) -> ApiSymbol {
    let name = qualified_name
        .rsplit(|c: char| c == '.' || c == ':')
        .next()
        .unwrap_or(qualified_name)
        .to_string();
    ApiSymbol::new(
        name.clone(),
        qualified_name,
        SymbolKind::Function,
        language,
        format!("src/{}", qualified_name.replace('.', "/")),
    )
    .with_signature(format!("{name}(value)"))
}

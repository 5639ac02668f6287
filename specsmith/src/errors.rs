//! Error types for specsmith.
//!
//! Failures are split by how far they are allowed to travel. Backend and
//! generation failures stay local to one work item; only [`SpecsmithError`]
//! is allowed to abort a whole run.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::generation::SamplingParameter;

/// The crate-level error type.
///
/// Reserved for failures that cannot be attributed to a single work item.
#[derive(Debug, Error)]
pub enum SpecsmithError {
    /// The generation backend could not be constructed.
    #[error("Client construction failed: {0}")]
    ClientConstruction(String),

    /// Configuration could not be loaded or was malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A target descriptor could not be parsed.
    #[error("Invalid target '{0}': expected <language>:<framework>")]
    InvalidTarget(String),

    /// A store operation outside of per-item persistence failed.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Logging could not be initialized.
    #[error("Logging initialization failed: {0}")]
    Logging(String),
}

/// Error reported by a completion backend for a single call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// Network failure, server error or rate limit. Retried with backoff.
    #[error("Transient service error{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Transient {
        /// HTTP status, when the service answered at all.
        status: Option<u16>,
        /// Error detail.
        message: String,
    },

    /// The call exceeded its deadline. Retried with backoff.
    #[error("Request timed out after {}ms", duration.as_millis())]
    Timeout {
        /// The deadline that elapsed.
        duration: Duration,
    },

    /// The service refused one or more request parameters.
    #[error("Unsupported parameter(s) [{}]: {message}", format_parameters(parameters))]
    UnsupportedParameter {
        /// The parameters named by the rejection.
        parameters: Vec<SamplingParameter>,
        /// Error detail.
        message: String,
    },

    /// The service rejected the request for a reason retrying cannot fix.
    #[error("Request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status.
        status: u16,
        /// Error detail.
        message: String,
    },
}

fn format_parameters(parameters: &[SamplingParameter]) -> String {
    parameters
        .iter()
        .map(|p| p.wire_name())
        .collect::<Vec<_>>()
        .join(", ")
}

impl BackendError {
    /// Creates a transient error without an HTTP status.
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            status: None,
            message: message.into(),
        }
    }

    /// Creates a transient error for an HTTP status.
    #[must_use]
    pub fn transient_status(status: u16, message: impl Into<String>) -> Self {
        Self::Transient {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Creates a terminal rejection.
    #[must_use]
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Creates an unsupported-parameter rejection.
    #[must_use]
    pub fn unsupported(parameters: Vec<SamplingParameter>, message: impl Into<String>) -> Self {
        Self::UnsupportedParameter {
            parameters,
            message: message.into(),
        }
    }

    /// Returns true if the error should be retried with backoff.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::Timeout { .. })
    }

    /// Short type tag used in logs and failure records.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transient { .. } => "transient",
            Self::Timeout { .. } => "timeout",
            Self::UnsupportedParameter { .. } => "unsupported_parameter",
            Self::Rejected { .. } => "rejected",
        }
    }
}

/// A generation request that the client gave up on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Generation failed after {attempts} attempt(s): {last_error}")]
pub struct GenerationFailure {
    /// Number of backend calls issued, negotiation reissues included.
    pub attempts: u32,
    /// The error returned by the final call.
    pub last_error: BackendError,
}

impl GenerationFailure {
    /// Creates a new generation failure.
    #[must_use]
    pub fn new(attempts: u32, last_error: BackendError) -> Self {
        Self {
            attempts,
            last_error,
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!("GenerationFailure"));
        map.insert("attempts".to_string(), serde_json::json!(self.attempts));
        map.insert("error_kind".to_string(), serde_json::json!(self.last_error.kind()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// Errors raised by artifact stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key cannot be mapped to a location inside the store.
    #[error("Invalid artifact key '{key}': {reason}")]
    InvalidKey {
        /// The offending key.
        key: String,
        /// Why it was refused.
        reason: String,
    },

    /// IO error.
    #[error("IO error for '{key}': {source}")]
    Io {
        /// The key being read or written.
        key: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Creates an invalid key error.
    #[must_use]
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Wraps an IO error for a key.
    #[must_use]
    pub fn io(key: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            key: key.into(),
            source,
        }
    }
}

/// How a single work item failed inside the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemFailureKind {
    /// The worker returned an error.
    Error,
    /// The worker panicked.
    Panic,
    /// The item was never started because the batch was cancelled.
    Cancelled,
    /// An earlier item in the batch already derived the same key.
    DuplicateKey,
}

/// Record of one work item that degraded to its sentinel result.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("Item {index} failed ({kind:?}): {message}")]
pub struct ItemFailure {
    /// Submission index of the item.
    pub index: usize,
    /// What went wrong.
    pub kind: ItemFailureKind,
    /// Error detail.
    pub message: String,
}

impl ItemFailure {
    /// Creates a new item failure record.
    #[must_use]
    pub fn new(index: usize, kind: ItemFailureKind, message: impl Into<String>) -> Self {
        Self {
            index,
            kind,
            message: message.into(),
        }
    }
}

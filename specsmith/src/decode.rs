//! Best-effort recovery of structured documents from model text.
//!
//! Models wrap JSON in prose, code fences and apologies. Decoding tries a
//! strict parse of the whole text, then a strict parse of the span between
//! the first `{` and the last `}`, and finally gives up with the schema's
//! fallback. It never panics. A stray brace inside a string literal can make
//! the span scan pick the wrong range; that is accepted.

use std::fmt;
use tracing::debug;

use crate::documents::StructuredDocument;

/// A response that could not be decoded into the expected schema.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeFailure<T> {
    /// The schema's documented empty structure.
    pub fallback: T,
    /// Why the last parse attempt failed.
    pub reason: String,
}

impl<T> DecodeFailure<T> {
    /// Consumes the failure, yielding the fallback document.
    pub fn into_fallback(self) -> T {
        self.fallback
    }
}

impl<T> fmt::Display for DecodeFailure<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Response could not be decoded: {}", self.reason)
    }
}

impl<T: fmt::Debug> std::error::Error for DecodeFailure<T> {}

/// Decodes `text` into `T`.
pub fn decode<T: StructuredDocument>(text: &str) -> Result<T, DecodeFailure<T>> {
    let trimmed = text.trim();

    let strict_error = match serde_json::from_str::<T>(trimmed) {
        Ok(doc) => return Ok(doc),
        Err(e) => e,
    };

    let reason = match brace_span(trimmed) {
        Some(span) => match serde_json::from_str::<T>(span) {
            Ok(doc) => return Ok(doc),
            Err(e) => e.to_string(),
        },
        None => format!("no JSON object found ({strict_error})"),
    };

    Err(DecodeFailure {
        fallback: T::fallback(),
        reason,
    })
}

/// Decodes `text` into `T`, degrading to the fallback on failure.
pub fn decode_or_fallback<T: StructuredDocument>(text: &str) -> T {
    decode(text).unwrap_or_else(|failure| {
        debug!(schema = T::SCHEMA, reason = %failure.reason, "Decode fell back to empty document");
        failure.into_fallback()
    })
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Extracts the body of the first fenced code block.
///
/// The language tag line after the opening fence is dropped. Text without a
/// complete fence is returned unchanged.
#[must_use]
pub fn strip_code_fence(text: &str) -> String {
    const FENCE: &str = "```";

    let Some(open) = text.find(FENCE) else {
        return text.to_string();
    };
    let mut rest = &text[open + FENCE.len()..];
    if let Some(newline) = rest.find('\n') {
        rest = &rest[newline + 1..];
    }
    match rest.find(FENCE) {
        Some(close) => rest[..close].trim().to_string(),
        None => text.to_string(),
    }
}

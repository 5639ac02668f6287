//! Generation client.
//!
//! This module provides:
//! - Request/result types for one call to the remote model
//! - The backend seam and HTTP failure classification
//! - Backoff configuration for transient failures
//! - The resilient client with one-shot parameter negotiation

mod backend;
mod client;
#[cfg(feature = "openai")]
mod openai;
mod request;
mod retry;

pub use backend::{classify_http_failure, offending_parameters, CompletionBackend};
pub use client::{GenerationClient, DEFAULT_REQUEST_TIMEOUT};
#[cfg(feature = "openai")]
pub use openai::OpenAiBackend;
pub use request::{
    CompletionCall, DecodingMode, GenerationRequest, GenerationResult, SamplingParameter,
    SamplingParams, DEFAULT_TEMPERATURE,
};
pub use retry::{calculate_delay, BackoffStrategy, JitterStrategy, RetryConfig, RetryState};

pub use crate::errors::{BackendError, GenerationFailure};

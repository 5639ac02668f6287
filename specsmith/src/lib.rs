//! # Specsmith
//!
//! Resilient concurrent orchestration for model-generated test artifacts.
//!
//! Specsmith drives a remote text-generation service to plan natural-language
//! test specifications, render them into executable tests for several target
//! ecosystems, and plan BDD feature narratives. It provides:
//!
//! - **Generation client**: retries transient failures with capped exponential
//!   backoff and negotiates away parameters the model refuses
//! - **Response decoding**: best-effort recovery of JSON documents wrapped in
//!   prose or code fences
//! - **Bounded dispatch**: order-preserving fan-out with bulkhead isolation
//! - **Resumable storage**: skip-existing runs with incremental, atomic writes
//! - **Pipelines**: flat-map and survey-then-expand compositions
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use specsmith::prelude::*;
//!
//! let config = AppConfig::from_env()?;
//! let client = GenerationClient::from_config(&config)?;
//! let store = ResumableStore::new(FsArtifactStore::new(config.specs_dir()), config.skip_existing);
//!
//! let planner = TestPlanner::new(client, Dispatcher::new(config.planner_concurrency));
//! let report = planner.plan(&symbols, &store, &LoggingObserver::default()).await?;
//! println!("{}", report.summary);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod decode;
pub mod dispatch;
pub mod documents;
pub mod errors;
pub mod generation;
pub mod observability;
pub mod pipeline;
pub mod store;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{AppConfig, LoggingConfig};
    pub use crate::core::{
        ApiSymbol, Artifact, ArtifactKey, ArtifactTarget, SpecFiles, SymbolKind, TargetSpec,
        TestFiles, WorkItem, WorkKey,
    };
    pub use crate::decode::{decode, decode_or_fallback, strip_code_fence, DecodeFailure};
    pub use crate::dispatch::{
        CallbackObserver, DispatchObserver, DispatchReport, Dispatcher, ItemFailure,
        LoggingObserver, NoOpObserver, Progress,
    };
    pub use crate::documents::{
        BddCapability, BddFeature, BddSurvey, FeatureSpec, StructuredDocument, TestCase,
        TestPlanDocument, TestSpec,
    };
    pub use crate::errors::SpecsmithError;
    pub use crate::generation::{
        BackendError, CompletionBackend, GenerationClient, GenerationFailure, GenerationRequest,
        GenerationResult, RetryConfig,
    };
    pub use crate::pipeline::{
        BatchSummary, BddPlanner, BddReport, FlatMapReport, ItemStatus, RenderedTest,
        TestPlanner, TestRenderer,
    };
    pub use crate::store::{ArtifactStore, FsArtifactStore, MemoryArtifactStore, ResumableStore};
}

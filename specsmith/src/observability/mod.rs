//! Observability for batch runs.
//!
//! This module provides:
//! - Tracing subscriber setup driven by [`LoggingConfig`]
//! - Run spans that tag every event of one pipeline run

mod logging;

pub use logging::{init_tracing, LogFormat, LoggingConfig, LOG_ENV};

use tracing::Span;
use uuid::Uuid;

/// Creates the span for one pipeline run.
///
/// Every event emitted while the span is entered carries the stage name and
/// a fresh time-ordered run id.
#[must_use]
pub fn run_span(stage: &'static str) -> (Span, Uuid) {
    let run_id = Uuid::now_v7();
    let span = tracing::info_span!("pipeline_run", stage, run_id = %run_id);
    (span, run_id)
}

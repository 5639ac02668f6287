//! Work dispatch.
//!
//! This module provides:
//! - A bounded, order-preserving dispatcher with bulkhead isolation
//! - Completion observers (no-op, logging, closure-based)
//! - Per-item failure records

mod dispatcher;
mod observer;

pub use dispatcher::{DispatchReport, Dispatcher, DEFAULT_CONCURRENCY};
pub use observer::{CallbackObserver, DispatchObserver, LoggingObserver, NoOpObserver, Progress};

pub use crate::errors::{ItemFailure, ItemFailureKind};

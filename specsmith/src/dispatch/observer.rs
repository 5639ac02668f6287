//! Completion observers for dispatched batches.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Position of a finished item within its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Items finished so far, this one included.
    pub completed: usize,
    /// Items in the batch.
    pub total: usize,
    /// Submission index of the item that just finished.
    pub index: usize,
}

impl Progress {
    /// Fraction of the batch completed, in `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Receives completion notifications in completion order.
///
/// Callbacks run synchronously on the dispatching task, so they should be
/// quick. A panic inside a callback is caught and logged by the dispatcher.
pub trait DispatchObserver<I: ?Sized, R>: Send + Sync {
    /// Called with the item's result (a sentinel for failed items).
    fn on_result(&self, _progress: Progress, _result: &R) {}

    /// Called after [`on_result`](Self::on_result) with the item itself.
    fn on_progress(&self, _progress: Progress, _item: &I) {}
}

/// An observer that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl<I: ?Sized, R> DispatchObserver<I, R> for NoOpObserver {}

/// An observer that reports progress through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingObserver {
    stage: String,
}

impl LoggingObserver {
    /// Creates a logging observer for a named stage.
    #[must_use]
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
        }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new("dispatch")
    }
}

impl<I: ?Sized, R> DispatchObserver<I, R> for LoggingObserver {
    fn on_result(&self, progress: Progress, _result: &R) {
        debug!(stage = %self.stage, index = progress.index, "Work item finished");
    }

    fn on_progress(&self, progress: Progress, _item: &I) {
        info!(
            stage = %self.stage,
            completed = progress.completed,
            total = progress.total,
            "Progress"
        );
    }
}

type ResultCallback<R> = Box<dyn Fn(Progress, &R) + Send + Sync>;
type ProgressCallback<I> = Box<dyn Fn(Progress, &I) + Send + Sync>;

/// An observer built from closures.
pub struct CallbackObserver<I: ?Sized, R> {
    result: Option<ResultCallback<R>>,
    progress: Option<ProgressCallback<I>>,
}

impl<I: ?Sized, R> CallbackObserver<I, R> {
    /// Creates an observer with no callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            result: None,
            progress: None,
        }
    }

    /// Sets the result callback.
    #[must_use]
    pub fn with_result_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(Progress, &R) + Send + Sync + 'static,
    {
        self.result = Some(Box::new(callback));
        self
    }

    /// Sets the progress callback.
    #[must_use]
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(Progress, &I) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(callback));
        self
    }
}

impl<I: ?Sized, R> Default for CallbackObserver<I, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ?Sized, R> DispatchObserver<I, R> for CallbackObserver<I, R> {
    fn on_result(&self, progress: Progress, result: &R) {
        if let Some(callback) = &self.result {
            callback(progress, result);
        }
    }

    fn on_progress(&self, progress: Progress, item: &I) {
        if let Some(callback) = &self.progress {
            callback(progress, item);
        }
    }
}

impl<I: ?Sized, R> std::fmt::Debug for CallbackObserver<I, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackObserver")
            .field("result", &self.result.is_some())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

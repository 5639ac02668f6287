//! Bounded, order-preserving fan-out.

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

use super::observer::{DispatchObserver, Progress};
use crate::cancellation::CancellationToken;
use crate::errors::{ItemFailure, ItemFailureKind};

/// Default number of concurrent workers.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Results of a dispatched batch.
#[derive(Debug, Clone)]
pub struct DispatchReport<R> {
    /// One result per submitted item, in submission order.
    pub results: Vec<R>,
    /// Items that degraded to their sentinel, in completion order.
    pub failures: Vec<ItemFailure>,
}

impl<R> DispatchReport<R> {
    /// True when no item failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// The failure record for a submission index, if that item failed.
    #[must_use]
    pub fn failure_for(&self, index: usize) -> Option<&ItemFailure> {
        self.failures.iter().find(|f| f.index == index)
    }
}

enum Outcome<R> {
    Done(R),
    Failed(ItemFailureKind, String),
}

/// Runs independent work items with a concurrency ceiling.
///
/// Workers run as a buffered stream on the caller's task, so at most
/// `concurrency` of them are in flight. An error or panic in one worker
/// only replaces that item's result with a sentinel.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    concurrency: usize,
    cancellation: Option<Arc<CancellationToken>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl Dispatcher {
    /// Creates a dispatcher. A limit of zero is treated as one.
    #[must_use]
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            cancellation: None,
        }
    }

    /// Attaches a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// The concurrency ceiling.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// The attached cancellation token, if any.
    #[must_use]
    pub fn cancellation(&self) -> Option<&Arc<CancellationToken>> {
        self.cancellation.as_ref()
    }

    /// Runs `worker` over every item.
    ///
    /// The returned results are index-aligned with `items`. Failed, panicked
    /// and cancelled items get `sentinel(item)` and a failure record. The
    /// observer is notified once per item as it completes.
    pub async fn dispatch<I, R, W, Fut, S>(
        &self,
        items: &[I],
        worker: W,
        sentinel: S,
        observer: &dyn DispatchObserver<I, R>,
    ) -> DispatchReport<R>
    where
        W: Fn(&I) -> Fut,
        Fut: Future<Output = anyhow::Result<R>>,
        S: Fn(&I) -> R,
    {
        let total = items.len();
        debug!(total, concurrency = self.concurrency, "Dispatching batch");

        let worker = &worker;
        let cancellation = self.cancellation.as_deref();

        let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();
        let mut failures = Vec::new();
        let mut completed = 0;

        let mut outcomes = stream::iter(items.iter().enumerate())
            .map(|(index, item)| async move {
                if let Some(token) = cancellation.filter(|t| t.is_cancelled()) {
                    let reason = token.reason().unwrap_or_default();
                    return (
                        index,
                        Outcome::Failed(ItemFailureKind::Cancelled, format!("batch cancelled: {reason}")),
                    );
                }
                let outcome = match AssertUnwindSafe(async { worker(item).await })
                    .catch_unwind()
                    .await
                {
                    Ok(Ok(result)) => Outcome::Done(result),
                    Ok(Err(error)) => Outcome::Failed(ItemFailureKind::Error, format!("{error:#}")),
                    Err(panic) => Outcome::Failed(ItemFailureKind::Panic, panic_message(&*panic)),
                };
                (index, outcome)
            })
            .buffer_unordered(self.concurrency);

        while let Some((index, outcome)) = outcomes.next().await {
            let item = &items[index];
            let result = match outcome {
                Outcome::Done(result) => result,
                Outcome::Failed(kind, message) => {
                    if kind != ItemFailureKind::Cancelled {
                        warn!(index, kind = ?kind, error = %message, "Work item failed, using sentinel");
                    }
                    failures.push(ItemFailure::new(index, kind, message));
                    sentinel(item)
                }
            };

            completed += 1;
            let progress = Progress {
                completed,
                total,
                index,
            };
            contain("on_result", || observer.on_result(progress, &result));
            contain("on_progress", || observer.on_progress(progress, item));

            slots[index] = Some(result);
        }

        let results = slots
            .into_iter()
            .zip(items)
            .map(|(slot, item)| slot.unwrap_or_else(|| sentinel(item)))
            .collect();

        DispatchReport { results, failures }
    }
}

fn contain(hook: &'static str, callback: impl FnOnce()) {
    if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(callback)) {
        warn!(hook, panic = %panic_message(&*panic), "Observer callback panicked");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

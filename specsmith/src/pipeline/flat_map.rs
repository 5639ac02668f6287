//! Flat-map pipeline shape: one generation stage over N independent items.

use chrono::Utc;
use std::collections::HashMap;
use std::future::Future;
use tracing::{info, warn, Instrument};

use super::summary::{BatchSummary, ItemStatus};
use crate::core::{find_duplicate_keys, Artifact, ArtifactTarget, WorkItem};
use crate::dispatch::{DispatchObserver, Dispatcher, ItemFailure, ItemFailureKind, Progress};
use crate::observability::run_span;
use crate::store::{ArtifactStore, PersistOutcome, ResumableStore};

/// Outcome of a flat-map run, index-aligned with the submitted items.
#[derive(Debug, Clone)]
pub struct FlatMapReport<R> {
    /// Status of each submitted item.
    pub statuses: Vec<ItemStatus>,
    /// Result of each dispatched item; `None` for skipped items.
    pub results: Vec<Option<R>>,
    /// Failure records, indexed by submission position.
    pub failures: Vec<ItemFailure>,
    /// Run counts.
    pub summary: BatchSummary,
}

impl<R> FlatMapReport<R> {
    /// Results that were generated in this run, in submission order.
    pub fn generated(&self) -> impl Iterator<Item = &R> {
        self.results.iter().flatten()
    }

    /// Items that ended with the given status.
    #[must_use]
    pub fn count(&self, status: ItemStatus) -> usize {
        self.statuses.iter().filter(|s| **s == status).count()
    }
}

/// The storage side of a flat-map stage.
pub(crate) struct FlatMap<'a, I, S> {
    pub stage: &'static str,
    pub dispatcher: &'a Dispatcher,
    pub store: &'a ResumableStore<S>,
    pub target: &'a dyn ArtifactTarget<I>,
}

impl<'a, I: WorkItem, S: ArtifactStore> FlatMap<'a, I, S> {
    /// Runs `worker` over every item that is not already persisted.
    ///
    /// `content` turns a result into artifact text; `None` means nothing to
    /// persist. Each result is persisted as soon as its worker finishes.
    /// An item whose key repeats an earlier item's key is not dispatched and
    /// is reported `Failed` at its own index.
    pub async fn run<R, W, Fut, N, C>(
        &self,
        items: &[I],
        worker: W,
        sentinel: N,
        content: C,
        observer: &dyn DispatchObserver<I, R>,
    ) -> FlatMapReport<R>
    where
        W: Fn(&I) -> Fut,
        Fut: Future<Output = anyhow::Result<R>>,
        N: Fn(&I) -> R,
        C: Fn(&R) -> anyhow::Result<Option<String>>,
    {
        let (span, run_id) = run_span(self.stage);
        let started_at = Utc::now();

        async move {
            let duplicates: HashMap<usize, usize> = find_duplicate_keys(items).into_iter().collect();
            let pending: Vec<(usize, &I)> = items
                .iter()
                .enumerate()
                .filter(|(index, item)| {
                    !duplicates.contains_key(index) && !self.store.should_skip(*item, self.target)
                })
                .collect();

            let skipped = items.len() - pending.len() - duplicates.len();
            info!(total = items.len(), skipped, duplicates = duplicates.len(), "Starting batch");

            let worker = &worker;
            let content = &content;
            let store = self.store;
            let target = self.target;

            let relay = Relay {
                inner: observer,
                positions: pending.iter().map(|(index, _)| *index).collect(),
            };

            let report = self
                .dispatcher
                .dispatch(
                    &pending,
                    |&(_, item)| async move {
                        let result = worker(item).await?;
                        let status = persist(store, target, item, &result, content).await?;
                        Ok::<_, anyhow::Error>((result, status))
                    },
                    |&(_, item)| (sentinel(item), ItemStatus::Failed),
                    &relay,
                )
                .await;

            let mut statuses = vec![ItemStatus::Skipped; items.len()];
            let mut results: Vec<Option<R>> = std::iter::repeat_with(|| None).take(items.len()).collect();
            for (&(index, _), (result, status)) in pending.iter().zip(report.results) {
                statuses[index] = status;
                results[index] = Some(result);
            }

            let mut failures: Vec<ItemFailure> = report
                .failures
                .into_iter()
                .map(|failure| ItemFailure {
                    index: relay.positions[failure.index],
                    ..failure
                })
                .collect();
            for (&index, &first) in &duplicates {
                let key = items[index].key();
                warn!(index, first, %key, "Duplicate work item key, item not dispatched");
                statuses[index] = ItemStatus::Failed;
                failures.push(ItemFailure::new(
                    index,
                    ItemFailureKind::DuplicateKey,
                    format!("key '{key}' already used by item {first}"),
                ));
            }
            failures.sort_by_key(|failure| failure.index);

            let summary = BatchSummary::from_statuses(self.stage, run_id, started_at, &statuses);
            info!(%summary, "Batch finished");

            FlatMapReport {
                statuses,
                results,
                failures,
                summary,
            }
        }
        .instrument(span)
        .await
    }
}

async fn persist<I, R, S, C>(
    store: &ResumableStore<S>,
    target: &dyn ArtifactTarget<I>,
    item: &I,
    result: &R,
    content: &C,
) -> anyhow::Result<ItemStatus>
where
    S: ArtifactStore,
    C: Fn(&R) -> anyhow::Result<Option<String>>,
{
    let Some(text) = content(result)? else {
        return Ok(ItemStatus::Empty);
    };

    let artifact = Artifact::new(target.artifact_key(item), text);
    Ok(match store.persist_async(&artifact).await? {
        PersistOutcome::Written => ItemStatus::Written,
        PersistOutcome::SkippedEmpty => ItemStatus::Empty,
        PersistOutcome::AlreadyWritten => ItemStatus::Skipped,
    })
}

/// Forwards notifications for dispatched items to the caller's observer,
/// mapping dispatch positions back to submission indices.
struct Relay<'o, I, R> {
    inner: &'o dyn DispatchObserver<I, R>,
    positions: Vec<usize>,
}

impl<I, R> Relay<'_, I, R> {
    fn remap(&self, progress: Progress) -> Progress {
        Progress {
            index: self.positions[progress.index],
            ..progress
        }
    }
}

impl<'i, I, R> DispatchObserver<(usize, &'i I), (R, ItemStatus)> for Relay<'_, I, R> {
    fn on_result(&self, progress: Progress, result: &(R, ItemStatus)) {
        self.inner.on_result(self.remap(progress), &result.0);
    }

    fn on_progress(&self, progress: Progress, item: &(usize, &'i I)) {
        self.inner.on_progress(self.remap(progress), item.1);
    }
}

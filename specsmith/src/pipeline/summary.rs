//! Per-item statuses and batch summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// What happened to one submitted item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// A new artifact was persisted.
    Written,
    /// An artifact from a previous run (or earlier in this run) was kept.
    Skipped,
    /// Generation succeeded but produced nothing worth persisting.
    Empty,
    /// Generation or persistence failed; the item holds a sentinel.
    Failed,
}

/// Counts for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Stage name.
    pub stage: String,
    /// Run identifier, shared with the run's tracing span.
    pub run_id: Uuid,
    /// Items submitted.
    pub total: usize,
    /// Items with a newly written artifact.
    pub written: usize,
    /// Items skipped as already present.
    pub skipped: usize,
    /// Items that produced nothing.
    pub empty: usize,
    /// Items that failed.
    pub failed: usize,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

impl BatchSummary {
    /// Tallies statuses for a finished run.
    #[must_use]
    pub fn from_statuses(
        stage: impl Into<String>,
        run_id: Uuid,
        started_at: DateTime<Utc>,
        statuses: &[ItemStatus],
    ) -> Self {
        let count = |wanted: ItemStatus| statuses.iter().filter(|s| **s == wanted).count();
        Self {
            stage: stage.into(),
            run_id,
            total: statuses.len(),
            written: count(ItemStatus::Written),
            skipped: count(ItemStatus::Skipped),
            empty: count(ItemStatus::Empty),
            failed: count(ItemStatus::Failed),
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Wall-clock duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// True when no item failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} item(s), {} written, {} skipped, {} empty, {} failed in {}ms",
            self.stage,
            self.total,
            self.written,
            self.skipped,
            self.empty,
            self.failed,
            self.duration_ms()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_and_display() {
        let summary = BatchSummary::from_statuses(
            "plan",
            Uuid::nil(),
            Utc::now(),
            &[
                ItemStatus::Written,
                ItemStatus::Written,
                ItemStatus::Skipped,
                ItemStatus::Failed,
                ItemStatus::Empty,
            ],
        );

        assert_eq!(summary.total, 5);
        assert_eq!(summary.written, 2);
        assert_eq!(summary.failed, 1);
        assert!(!summary.is_success());
        assert!(summary
            .to_string()
            .starts_with("plan: 5 item(s), 2 written, 1 skipped, 1 empty, 1 failed in "));
    }
}

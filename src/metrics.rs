//! Per-controller invocation counters.
//! Every run is counted when it starts and again when it settles, either as
//! committed (completed or failed) or as discarded because it was superseded.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// The counters a controller keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunMetric {
    Started,
    Completed,
    Failed,
    Discarded,
    Canceled,
}

impl RunMetric {
    /// Stable name used in log events.
    pub fn as_str(self) -> &'static str {
        match self {
            RunMetric::Started => "runs_started",
            RunMetric::Completed => "runs_completed",
            RunMetric::Failed => "runs_failed",
            RunMetric::Discarded => "runs_discarded",
            RunMetric::Canceled => "cancels",
        }
    }
}

#[derive(Default)]
pub struct RunMetrics {
    started: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    discarded: AtomicU64,
    canceled: AtomicU64,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, metric: RunMetric) -> &AtomicU64 {
        match metric {
            RunMetric::Started => &self.started,
            RunMetric::Completed => &self.completed,
            RunMetric::Failed => &self.failed,
            RunMetric::Discarded => &self.discarded,
            RunMetric::Canceled => &self.canceled,
        }
    }

    pub fn record(&self, metric: RunMetric) {
        let value = self.counter(metric).fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(metric = metric.as_str(), value = value, "metric_recorded");
    }

    pub fn summary(&self) -> MetricSummary {
        MetricSummary {
            started: self.started.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            canceled: self.canceled.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricSummary {
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
    pub discarded: u64,
    pub canceled: u64,
}

impl MetricSummary {
    /// Runs that have neither committed nor been discarded yet.
    pub fn in_flight(&self) -> u64 {
        self.started
            .saturating_sub(self.completed + self.failed + self.discarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_each_metric_separately() {
        let metrics = RunMetrics::new();
        metrics.record(RunMetric::Started);
        metrics.record(RunMetric::Started);
        metrics.record(RunMetric::Discarded);
        metrics.record(RunMetric::Canceled);

        let summary = metrics.summary();
        assert_eq!(summary.started, 2);
        assert_eq!(summary.discarded, 1);
        assert_eq!(summary.canceled, 1);
        assert_eq!(summary.completed, 0);
        assert_eq!(summary.in_flight(), 1);
    }

    #[test]
    fn summary_serializes() {
        let metrics = RunMetrics::new();
        metrics.record(RunMetric::Completed);
        let json = serde_json::to_value(metrics.summary()).expect("serializable");
        assert_eq!(json["completed"], 1);
        assert_eq!(json["failed"], 0);
    }

    #[test]
    fn metric_names_are_stable() {
        assert_eq!(RunMetric::Completed.as_str(), "runs_completed");
        assert_eq!(RunMetric::Canceled.as_str(), "cancels");
    }
}

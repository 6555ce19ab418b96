//! Sink metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a single sink
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Batches started (including reopened keep-open batches)
    started_count: AtomicU64,
    /// Append calls that succeeded
    append_count: AtomicU64,
    /// Batches ended successfully
    ended_count: AtomicU64,
    /// Phase failures
    failure_count: AtomicU64,
    /// Phases skipped because the sink already failed this batch
    skipped_count: AtomicU64,
}

impl SinkMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started_count(&self) -> u64 {
        self.started_count.load(Ordering::Relaxed)
    }

    pub fn inc_started_count(&self) {
        self.started_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn append_count(&self) -> u64 {
        self.append_count.load(Ordering::Relaxed)
    }

    pub fn inc_append_count(&self) {
        self.append_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ended_count(&self) -> u64 {
        self.ended_count.load(Ordering::Relaxed)
    }

    pub fn inc_ended_count(&self) {
        self.ended_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn skipped_count(&self) -> u64 {
        self.skipped_count.load(Ordering::Relaxed)
    }

    pub fn inc_skipped_count(&self) {
        self.skipped_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            started_count: self.started_count(),
            append_count: self.append_count(),
            ended_count: self.ended_count(),
            failure_count: self.failure_count(),
            skipped_count: self.skipped_count(),
        }
    }
}

/// Snapshot of sink metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub started_count: u64,
    pub append_count: u64,
    pub ended_count: u64,
    pub failure_count: u64,
    pub skipped_count: u64,
}

//! Cache counters

use std::sync::atomic::{AtomicU64, Ordering};

/// In-process counters of one event cache
#[derive(Debug, Default)]
pub struct CacheMetrics {
    records_added: AtomicU64,
    batches_submitted: AtomicU64,
    batches_published: AtomicU64,
    batches_failed: AtomicU64,
    empty_flushes: AtomicU64,
    /// Records carried by successful non-keep-open batches
    records_published: AtomicU64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_records_added(&self) {
        self.records_added.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_batches_submitted(&self) {
        self.batches_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_batches_published(&self) {
        self.batches_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_batches_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_empty_flushes(&self) {
        self.empty_flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_records_published(&self, records: usize) {
        self.records_published
            .fetch_add(records as u64, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            records_added: self.records_added.load(Ordering::Relaxed),
            batches_submitted: self.batches_submitted.load(Ordering::Relaxed),
            batches_published: self.batches_published.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            empty_flushes: self.empty_flushes.load(Ordering::Relaxed),
            records_published: self.records_published.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of cache counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheMetricsSnapshot {
    pub records_added: u64,
    pub batches_submitted: u64,
    pub batches_published: u64,
    pub batches_failed: u64,
    pub empty_flushes: u64,
    pub records_published: u64,
}

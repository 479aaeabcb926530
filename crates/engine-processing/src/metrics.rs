use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    rows_read: AtomicU64,
    rows_written: AtomicU64,
    rows_skipped: AtomicU64,
}

/// Row counters of a transfer. Cloning shares the same counters.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub rows_read: u64,
    pub rows_written: u64,
    pub rows_skipped: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    pub fn increment_read(&self, count: u64) {
        self.inner.rows_read.fetch_add(count, Ordering::Relaxed);
    }

    /// Returns the running total of written rows.
    pub fn increment_written(&self, count: u64) -> u64 {
        self.inner.rows_written.fetch_add(count, Ordering::Relaxed) + count
    }

    pub fn increment_skipped(&self, count: u64) {
        self.inner.rows_skipped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rows_read: self.inner.rows_read.load(Ordering::Relaxed),
            rows_written: self.inner.rows_written.load(Ordering::Relaxed),
            rows_skipped: self.inner.rows_skipped.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.inner.rows_read.store(0, Ordering::Relaxed);
        self.inner.rows_written.store(0, Ordering::Relaxed);
        self.inner.rows_skipped.store(0, Ordering::Relaxed);
    }
}

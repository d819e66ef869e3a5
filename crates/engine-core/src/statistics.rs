use model::statistics::ProcessStatistics;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerCounters {
    incoming_total: AtomicU64,
    created: AtomicU64,
    updated: AtomicU64,
    skipped: AtomicU64,
    deleted: AtomicU64,
    failed: AtomicU64,
}

/// Tallies the outcome of every entity in a run.
///
/// Cloning shares the counters, so a reporter can snapshot them while the run is going.
#[derive(Debug, Clone)]
pub struct StatisticsRecorder {
    inner: Arc<InnerCounters>,
}

impl StatisticsRecorder {
    pub fn new() -> Self {
        StatisticsRecorder {
            inner: Arc::new(InnerCounters::default()),
        }
    }

    pub fn record_incoming(&self, count: u64) {
        self.inner.incoming_total.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_created(&self) {
        self.inner.created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_updated(&self) {
        self.inner.updated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.inner.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deleted(&self) {
        self.inner.deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.inner.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProcessStatistics {
        ProcessStatistics {
            incoming_total: self.inner.incoming_total.load(Ordering::Relaxed),
            created: self.inner.created.load(Ordering::Relaxed),
            updated: self.inner.updated.load(Ordering::Relaxed),
            skipped: self.inner.skipped.load(Ordering::Relaxed),
            deleted: self.inner.deleted.load(Ordering::Relaxed),
            failed: self.inner.failed.load(Ordering::Relaxed),
        }
    }
}

impl Default for StatisticsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

//! Producer counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Ingestion metrics shared by all producers of a pipeline
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Raw records pulled from sources
    pub records_received: AtomicU64,

    /// Frames accepted by their sink
    pub frames_pushed: AtomicU64,

    /// Records dropped as unparseable
    pub parse_failures: AtomicU64,

    /// Frames dropped for arriving out of order
    pub ordering_violations: AtomicU64,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.records_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pushed(&self) {
        self.frames_pushed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parse_failure(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ordering_violation(&self) {
        self.ordering_violations.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_received: self.records_received.load(Ordering::Relaxed),
            frames_pushed: self.frames_pushed.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            ordering_violations: self.ordering_violations.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_received: u64,
    pub frames_pushed: u64,
    pub parse_failures: u64,
    pub ordering_violations: u64,
}

//! Observability metrics for admission control.
//!
//! Provides metrics about rate limiting behavior for monitoring and debugging.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking admission statistics.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    /// Total number of requests admitted
    requests_admitted: AtomicU64,
    /// Total number of requests rejected with 429
    requests_rejected: AtomicU64,
    /// Total number of buckets created
    buckets_created: AtomicU64,
    /// Total number of buckets removed by the reaper
    buckets_evicted: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                requests_admitted: AtomicU64::new(0),
                requests_rejected: AtomicU64::new(0),
                buckets_created: AtomicU64::new(0),
                buckets_evicted: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn record_admitted(&self) {
        self.inner.requests_admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.inner.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_bucket_created(&self) {
        self.inner.buckets_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evictions(&self, count: u64) {
        if count > 0 {
            self.inner.buckets_evicted.fetch_add(count, Ordering::Relaxed);
        }
    }

    /// Get the total number of requests admitted.
    pub fn requests_admitted(&self) -> u64 {
        self.inner.requests_admitted.load(Ordering::Relaxed)
    }

    /// Get the total number of requests rejected.
    pub fn requests_rejected(&self) -> u64 {
        self.inner.requests_rejected.load(Ordering::Relaxed)
    }

    /// Get the total number of buckets created.
    pub fn buckets_created(&self) -> u64 {
        self.inner.buckets_created.load(Ordering::Relaxed)
    }

    /// Get the total number of buckets evicted.
    pub fn buckets_evicted(&self) -> u64 {
        self.inner.buckets_evicted.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_admitted: self.requests_admitted(),
            requests_rejected: self.requests_rejected(),
            buckets_created: self.buckets_created(),
            buckets_evicted: self.buckets_evicted(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Total number of requests admitted
    pub requests_admitted: u64,
    /// Total number of requests rejected
    pub requests_rejected: u64,
    /// Total number of buckets created
    pub buckets_created: u64,
    /// Total number of buckets evicted
    pub buckets_evicted: u64,
}

impl MetricsSnapshot {
    /// Calculate the rejection rate (0.0 to 1.0).
    ///
    /// Returns 0.0 if no requests have been checked.
    pub fn rejection_rate(&self) -> f64 {
        let total = self.requests_admitted.saturating_add(self.requests_rejected);
        if total == 0 {
            0.0
        } else {
            self.requests_rejected as f64 / total as f64
        }
    }

    /// Buckets currently expected in the registry.
    pub fn live_buckets(&self) -> u64 {
        self.buckets_created.saturating_sub(self.buckets_evicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_counting() {
        let metrics = Metrics::new();

        metrics.record_admitted();
        metrics.record_admitted();
        metrics.record_rejected();
        metrics.record_bucket_created();
        metrics.record_evictions(0);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_admitted, 2);
        assert_eq!(snapshot.requests_rejected, 1);
        assert_eq!(snapshot.buckets_created, 1);
        assert_eq!(snapshot.buckets_evicted, 0);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = Metrics::new();
        let clone = metrics.clone();

        clone.record_rejected();
        clone.record_evictions(3);

        assert_eq!(metrics.requests_rejected(), 1);
        assert_eq!(metrics.buckets_evicted(), 3);
    }

    #[test]
    fn test_rejection_rate() {
        let metrics = Metrics::new();
        assert_eq!(metrics.snapshot().rejection_rate(), 0.0);

        for _ in 0..3 {
            metrics.record_admitted();
        }
        metrics.record_rejected();

        assert!((metrics.snapshot().rejection_rate() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_live_buckets() {
        let metrics = Metrics::new();
        for _ in 0..5 {
            metrics.record_bucket_created();
        }
        metrics.record_evictions(2);

        assert_eq!(metrics.snapshot(), MetricsSnapshot {
            requests_admitted: 0,
            requests_rejected: 0,
            buckets_created: 5,
            buckets_evicted: 2,
        });
        assert_eq!(metrics.snapshot().live_buckets(), 3);
    }
}

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lightweight counters for queue traffic and wait outcomes.
///
/// # Example
/// ```rust
/// use acheron_core::metrics::QueueMetrics;
///
/// let metrics = QueueMetrics::default();
/// metrics.queued();
/// metrics.delivered();
/// assert_eq!(metrics.queued_count(), 1);
/// assert_eq!(metrics.delivered_count(), 1);
/// ```
#[derive(Debug, Default, Clone)]
pub struct QueueMetrics {
    inner: Arc<QueueMetricsInner>,
}

#[derive(Debug, Default)]
struct QueueMetricsInner {
    queued: AtomicU64,
    delivered: AtomicU64,
    timeouts: AtomicU64,
    flushes: AtomicU64,
}

impl QueueMetrics {
    pub fn queued(&self) {
        self.inner.queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivered(&self) {
        self.inner.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn timed_out(&self) {
        self.inner.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn flushed(&self) {
        self.inner.flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn queued_count(&self) -> u64 {
        self.inner.queued.load(Ordering::Relaxed)
    }

    pub fn delivered_count(&self) -> u64 {
        self.inner.delivered.load(Ordering::Relaxed)
    }

    pub fn timeout_count(&self) -> u64 {
        self.inner.timeouts.load(Ordering::Relaxed)
    }

    pub fn flush_count(&self) -> u64 {
        self.inner.flushes.load(Ordering::Relaxed)
    }
}

/// Frame accounting shared between a task and its engine.
///
/// `submitted` counts inputs accepted from the caller, `consumed` counts
/// inputs the engine claimed, `produced` counts outputs delivered, and
/// `returned` counts output buffers the caller handed back.
#[derive(Debug, Default)]
pub struct SessionCounters {
    submitted: AtomicU64,
    consumed: AtomicU64,
    produced: AtomicU64,
    returned: AtomicU64,
}

impl SessionCounters {
    pub fn inc_submitted(&self) -> u64 {
        self.submitted.fetch_add(1, Ordering::Relaxed)
    }

    pub fn inc_consumed(&self) {
        self.consumed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_produced(&self) {
        self.produced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_returned(&self) {
        self.returned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub fn consumed(&self) -> u64 {
        self.consumed.load(Ordering::Relaxed)
    }

    pub fn produced(&self) -> u64 {
        self.produced.load(Ordering::Relaxed)
    }

    pub fn returned(&self) -> u64 {
        self.returned.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_independently() {
        let counters = SessionCounters::default();
        let first = counters.inc_submitted();
        assert_eq!(first, 0);
        counters.inc_submitted();
        counters.inc_consumed();
        counters.inc_produced();
        assert_eq!(counters.submitted(), 2);
        assert_eq!(counters.consumed(), 1);
        assert_eq!(counters.produced(), 1);
        assert_eq!(counters.returned(), 0);
    }
}

//! Latency tracking and worker counters
//!
//! `LatencyTracker` keeps a bounded FIFO window of samples and answers
//! nearest-rank percentiles over it. `WorkerMetrics` counts compute worker
//! traffic and records per-request compute time.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Counters shared between the compute worker thread and its owner.
pub struct WorkerMetrics {
    pub requests_processed: AtomicU64,
    pub requests_failed: AtomicU64,
    pub malformed_messages: AtomicU64,
    pub compute_time_us: Mutex<LatencyTracker>,
}

impl WorkerMetrics {
    pub fn new() -> Self {
        Self {
            requests_processed: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            malformed_messages: AtomicU64::new(0),
            compute_time_us: Mutex::new(LatencyTracker::new(1000)),
        }
    }

    /// Record a request answered with a result.
    pub fn record_success(&self, compute_us: u64) {
        self.requests_processed.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut tracker) = self.compute_time_us.lock() {
            tracker.record(compute_us as f64);
        }
    }

    /// Record a request answered with an ERROR.
    pub fn record_failure(&self) {
        self.requests_processed.fetch_add(1, Ordering::Relaxed);
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a line that could not be parsed into a request at all.
    pub fn record_malformed(&self) {
        self.malformed_messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Export counters and compute-time percentiles.
    pub fn export(&self) -> BTreeMap<String, u64> {
        let mut m = BTreeMap::new();
        m.insert("requests_processed".to_string(), self.requests_processed.load(Ordering::Relaxed));
        m.insert("requests_failed".to_string(), self.requests_failed.load(Ordering::Relaxed));
        m.insert("malformed_messages".to_string(), self.malformed_messages.load(Ordering::Relaxed));
        if let Ok(tracker) = self.compute_time_us.lock() {
            if let Some(p50) = tracker.percentile(0.5) {
                m.insert("compute_time_us_p50".to_string(), p50 as u64);
            }
            if let Some(p99) = tracker.percentile(0.99) {
                m.insert("compute_time_us_p99".to_string(), p99 as u64);
            }
        }
        m
    }
}

impl Default for WorkerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks latency samples for percentile calculation.
#[derive(Debug, Clone)]
pub struct LatencyTracker {
    samples: VecDeque<f64>,
    max_samples: usize,
}

impl LatencyTracker {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    /// Record a sample, evicting the oldest once the window is full.
    pub fn record(&mut self, value: f64) {
        if self.max_samples == 0 {
            return;
        }
        if self.samples.len() >= self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    /// Nearest-rank percentile, `p` in `[0, 1]`: the sample at sorted index
    /// `ceil(n * p) - 1`, clamped to the window.
    pub fn percentile(&self, p: f64) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }

        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);

        let rank = (sorted.len() as f64 * p.clamp(0.0, 1.0)).ceil() as usize;
        let idx = rank.saturating_sub(1).min(sorted.len() - 1);
        Some(sorted[idx])
    }

    /// Average of the samples in the window.
    pub fn average(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: f64 = self.samples.iter().sum();
        Some(sum / self.samples.len() as f64)
    }

    /// Number of samples in the window.
    pub fn count(&self) -> usize {
        self.samples.len()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_tracker_nearest_rank() {
        let mut tracker = LatencyTracker::new(100);
        for i in 1..=100 {
            tracker.record(i as f64);
        }

        assert_eq!(tracker.percentile(0.5), Some(50.0));
        assert_eq!(tracker.percentile(0.95), Some(95.0));
        assert_eq!(tracker.percentile(0.99), Some(99.0));
        assert_eq!(tracker.percentile(1.0), Some(100.0));
        assert_eq!(tracker.percentile(0.0), Some(1.0));
    }

    #[test]
    fn test_latency_tracker_unsorted_input() {
        let mut tracker = LatencyTracker::new(10);
        for v in [30.0, 10.0, 20.0] {
            tracker.record(v);
        }
        // ceil(3 * 0.5) - 1 = 1
        assert_eq!(tracker.percentile(0.5), Some(20.0));
    }

    #[test]
    fn test_latency_tracker_empty() {
        let tracker = LatencyTracker::new(10);
        assert_eq!(tracker.percentile(0.5), None);
        assert_eq!(tracker.average(), None);
    }

    #[test]
    fn test_latency_tracker_average() {
        let mut tracker = LatencyTracker::new(100);
        tracker.record(100.0);
        tracker.record(200.0);
        tracker.record(300.0);

        assert_eq!(tracker.average(), Some(200.0));
    }

    #[test]
    fn test_latency_tracker_window_eviction() {
        let mut tracker = LatencyTracker::new(3);

        tracker.record(10.0);
        tracker.record(20.0);
        tracker.record(30.0);
        tracker.record(40.0); // Should evict 10

        assert_eq!(tracker.count(), 3);
        assert_eq!(tracker.average(), Some(30.0));
    }

    #[test]
    fn test_worker_metrics_export() {
        let metrics = WorkerMetrics::new();
        metrics.record_success(120);
        metrics.record_success(80);
        metrics.record_failure();
        metrics.record_malformed();

        let exported = metrics.export();
        assert_eq!(exported["requests_processed"], 3);
        assert_eq!(exported["requests_failed"], 1);
        assert_eq!(exported["malformed_messages"], 1);
        assert_eq!(exported["compute_time_us_p50"], 80);
        assert_eq!(exported["compute_time_us_p99"], 120);
    }
}

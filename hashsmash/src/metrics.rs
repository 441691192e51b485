use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Low-contention counters shared by the producer, the workers and the reporter.
///
/// Workers add to `candidates_processed` once per chunk rather than once per
/// candidate, so readers see an approximate, eventually consistent count.
#[derive(Debug, Clone)]
pub struct SearchMetrics {
    candidates_processed: Arc<AtomicU64>,
    chunks_dispatched: Arc<AtomicU64>,
    chunks_completed: Arc<AtomicU64>,
    in_flight_chunks: Arc<AtomicU64>,
    peak_in_flight_chunks: Arc<AtomicU64>,
}

impl SearchMetrics {
    /// Creates a new SearchMetrics instance
    pub fn new() -> Self {
        Self {
            candidates_processed: Arc::new(AtomicU64::new(0)),
            chunks_dispatched: Arc::new(AtomicU64::new(0)),
            chunks_completed: Arc::new(AtomicU64::new(0)),
            in_flight_chunks: Arc::new(AtomicU64::new(0)),
            peak_in_flight_chunks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records a chunk materialized by the producer
    pub fn record_chunk_created(&self) {
        self.chunks_dispatched.fetch_add(1, Ordering::Relaxed);
        let live = self.in_flight_chunks.fetch_add(1, Ordering::Relaxed) + 1;
        let mut peak = self.peak_in_flight_chunks.load(Ordering::Relaxed);
        while live > peak {
            match self.peak_in_flight_chunks.compare_exchange_weak(
                peak,
                live,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => peak = current,
            }
        }
    }

    /// Records a chunk that has been processed or abandoned and dropped
    pub fn record_chunk_released(&self, candidates_checked: u64) {
        self.candidates_processed
            .fetch_add(candidates_checked, Ordering::Relaxed);
        self.chunks_completed.fetch_add(1, Ordering::Relaxed);
        self.in_flight_chunks.fetch_sub(1, Ordering::Relaxed);
    }

    /// Current approximate number of candidates hashed
    pub fn candidates_processed(&self) -> u64 {
        self.candidates_processed.load(Ordering::Relaxed)
    }

    /// Gets a point-in-time copy of all counters
    pub fn get_stats(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            candidates_processed: self.candidates_processed.load(Ordering::Relaxed),
            chunks_dispatched: self.chunks_dispatched.load(Ordering::Relaxed),
            chunks_completed: self.chunks_completed.load(Ordering::Relaxed),
            in_flight_chunks: self.in_flight_chunks.load(Ordering::Relaxed),
            peak_in_flight_chunks: self.peak_in_flight_chunks.load(Ordering::Relaxed),
        }
    }

    /// Logs current counters
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Search stats: {} candidates hashed, {}/{} chunks completed, peak {} chunks in flight",
            stats.candidates_processed,
            stats.chunks_completed,
            stats.chunks_dispatched,
            stats.peak_in_flight_chunks
        );
        debug!("Chunks still in flight: {}", stats.in_flight_chunks);
    }
}

impl Default for SearchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter values captured at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub candidates_processed: u64,
    pub chunks_dispatched: u64,
    pub chunks_completed: u64,
    pub in_flight_chunks: u64,
    pub peak_in_flight_chunks: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_lifecycle_tracking() {
        let metrics = SearchMetrics::new();

        metrics.record_chunk_created();
        metrics.record_chunk_created();
        metrics.record_chunk_created();
        let stats = metrics.get_stats();
        assert_eq!(stats.chunks_dispatched, 3);
        assert_eq!(stats.in_flight_chunks, 3);
        assert_eq!(stats.peak_in_flight_chunks, 3);

        metrics.record_chunk_released(100);
        metrics.record_chunk_released(40);
        let stats = metrics.get_stats();
        assert_eq!(stats.in_flight_chunks, 1);
        assert_eq!(stats.peak_in_flight_chunks, 3); // Peak should remain unchanged
        assert_eq!(stats.candidates_processed, 140);
        assert_eq!(stats.chunks_completed, 2);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = SearchMetrics::new();
        let clone = metrics.clone();

        clone.record_chunk_created();
        clone.record_chunk_released(7);
        assert_eq!(metrics.candidates_processed(), 7);
    }

    #[test]
    fn test_concurrent_updates() {
        let metrics = SearchMetrics::new();
        std::thread::scope(|s| {
            for _ in 0..4 {
                let m = metrics.clone();
                s.spawn(move || {
                    for _ in 0..1000 {
                        m.record_chunk_created();
                        m.record_chunk_released(2);
                    }
                });
            }
        });

        let stats = metrics.get_stats();
        assert_eq!(stats.candidates_processed, 8000);
        assert_eq!(stats.in_flight_chunks, 0);
        assert!(stats.peak_in_flight_chunks >= 1 && stats.peak_in_flight_chunks <= 4);
    }
}

use crossbeam_channel::{bounded, select, tick, Sender};
use serde::Serialize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::metrics::SearchMetrics;
use crate::results::{CrackReport, RunStats, SearchOutcome};

/// Throughput sample handed to progress callbacks
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProgressSnapshot {
    pub candidates_processed: u64,
    #[serde(serialize_with = "crate::results::serialize_duration")]
    pub elapsed: Duration,
    pub hashes_per_second: f64,
}

impl ProgressSnapshot {
    fn sample(metrics: &SearchMetrics, started: Instant) -> Self {
        let candidates_processed = metrics.candidates_processed();
        let elapsed = started.elapsed();
        Self {
            candidates_processed,
            elapsed,
            hashes_per_second: rate(candidates_processed, elapsed),
        }
    }
}

/// Type alias for progress callback function
pub type ProgressCallback = Arc<dyn Fn(&ProgressSnapshot) + Send + Sync>;

/// Samples search throughput on a timer and produces the final report.
///
/// The sampler runs on its own thread and only reads the shared counters, so
/// workers never wait on it.
pub struct Reporter {
    metrics: SearchMetrics,
    started: Instant,
    sampler: Option<(Sender<()>, JoinHandle<()>)>,
}

impl Reporter {
    /// Creates a reporter without a sampling thread
    pub fn new(metrics: SearchMetrics) -> Self {
        Self {
            metrics,
            started: Instant::now(),
            sampler: None,
        }
    }

    /// Creates a reporter that calls `callback` every `interval`
    pub fn with_progress(
        metrics: SearchMetrics,
        interval: Duration,
        callback: ProgressCallback,
    ) -> Self {
        let mut reporter = Self::new(metrics);
        if interval.is_zero() {
            return reporter;
        }

        let (done_tx, done_rx) = bounded::<()>(0);
        let metrics = reporter.metrics.clone();
        let started = reporter.started;
        let spawned = thread::Builder::new()
            .name("hashsmash-reporter".to_string())
            .spawn(move || {
                let ticker = tick(interval);
                loop {
                    select! {
                        recv(done_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            let snapshot = ProgressSnapshot::sample(&metrics, started);
                            debug!(
                                "Progress: {} candidates, {:.0} H/s",
                                snapshot.candidates_processed, snapshot.hashes_per_second
                            );
                            callback(&snapshot);
                        }
                    }
                }
            });

        match spawned {
            Ok(handle) => reporter.sampler = Some((done_tx, handle)),
            Err(e) => warn!("Progress reporting disabled: {}", e),
        }
        reporter
    }

    /// Stops sampling and wraps the terminal outcome in a report
    pub fn finish(mut self, outcome: SearchOutcome, lines_skipped: u64, timed_out: bool) -> CrackReport {
        if let Some((done_tx, handle)) = self.sampler.take() {
            drop(done_tx);
            if handle.join().is_err() {
                warn!("Progress callback panicked");
            }
        }

        let counters = self.metrics.get_stats();
        let stats = RunStats {
            candidates_processed: counters.candidates_processed,
            lines_skipped,
            chunks_dispatched: counters.chunks_dispatched,
            peak_in_flight_chunks: counters.peak_in_flight_chunks,
            elapsed: self.started.elapsed(),
            timed_out,
        };

        info!(
            "Search finished: {} after {} candidates in {:.2?} ({:.0} H/s)",
            outcome,
            stats.candidates_processed,
            stats.elapsed,
            stats.hashes_per_second()
        );
        CrackReport { outcome, stats }
    }
}

pub(crate) fn rate(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}

use crossbeam_channel::{bounded, Receiver, SendError, Sender};
use rayon::prelude::*;
use std::any::Any;
use std::io::BufRead;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace};

use super::state::{FinalState, SharedSearchState};
use crate::algorithm::TargetHash;
use crate::errors::{CrackError, CrackResult};
use crate::hasher;
use crate::metrics::SearchMetrics;
use crate::wordlist::{CandidateSource, Chunk};

// Candidates between deadline checks inside a chunk
const DEADLINE_CHECK_INTERVAL: u64 = 256;

/// Decides whether a candidate is a preimage of the target
pub trait CandidateMatcher: Sync {
    fn is_match(&self, candidate: &str) -> bool;
}

impl CandidateMatcher for TargetHash {
    fn is_match(&self, candidate: &str) -> bool {
        hasher::digest_matches(self.algorithm(), candidate, self.decoded_bytes())
    }
}

/// Scheduling parameters for one run
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorSettings {
    /// Worker pool size
    pub thread_count: NonZeroUsize,
    /// Maximum number of chunks waiting in the queue
    pub queue_capacity: NonZeroUsize,
    /// Optional wall-clock limit for the run
    pub timeout: Option<Duration>,
}

/// What the coordinator hands back once the pool has gone quiet
#[derive(Debug)]
pub struct RunSummary {
    pub state: FinalState,
    pub lines_skipped: u64,
}

/// Drives the worker pool over a chunk stream.
///
/// A single producer thread reads chunks in order and pushes them onto a
/// bounded queue; `thread_count` rayon workers pull from it. The producer
/// stops as soon as a match is recorded, since every chunk it has not read yet
/// lies after that match. Workers skip any chunk or candidate that could no
/// longer beat the recorded line, and keep draining everything before it.
pub struct SearchCoordinator<M> {
    matcher: M,
    settings: CoordinatorSettings,
    metrics: SearchMetrics,
}

impl<M: CandidateMatcher> SearchCoordinator<M> {
    pub fn new(matcher: M, settings: CoordinatorSettings) -> Self {
        Self::with_metrics(matcher, settings, SearchMetrics::new())
    }

    /// Creates a coordinator that reports into existing metrics
    pub fn with_metrics(matcher: M, settings: CoordinatorSettings, metrics: SearchMetrics) -> Self {
        Self {
            matcher,
            settings,
            metrics,
        }
    }

    /// Gets the metrics this coordinator updates
    pub fn metrics(&self) -> &SearchMetrics {
        &self.metrics
    }

    /// Runs the search to quiescence and returns what the shared state holds
    pub fn run<R: BufRead + Send>(&self, source: CandidateSource<R>) -> CrackResult<RunSummary> {
        let thread_count = self.settings.thread_count.get();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .thread_name(|i| format!("hashsmash-worker-{}", i))
            .build()
            .map_err(|e| CrackError::worker_failure(format!("failed to start worker pool: {}", e)))?;

        let deadline = self.settings.timeout.map(|t| Instant::now() + t);
        let state = SharedSearchState::new(deadline);
        let (sender, receiver) = bounded::<Chunk>(self.settings.queue_capacity.get());

        info!(
            "Starting search with {} workers, queue capacity {}, batch size {}",
            thread_count,
            self.settings.queue_capacity,
            source.batch_size()
        );

        let lines_skipped = std::thread::scope(|scope| {
            let producer = std::thread::Builder::new()
                .name("hashsmash-producer".to_string())
                .spawn_scoped(scope, || self.produce(source, sender, &state));

            let producer = match producer {
                Ok(handle) => handle,
                Err(e) => {
                    state.fail(CrackError::worker_failure(format!(
                        "failed to start producer: {}",
                        e
                    )));
                    return 0;
                }
            };

            pool.install(|| self.consume(receiver, &state));

            match producer.join() {
                Ok(skipped) => skipped,
                Err(payload) => {
                    state.fail(CrackError::worker_failure(format!(
                        "producer panicked: {}",
                        panic_message(payload.as_ref())
                    )));
                    0
                }
            }
        });

        self.metrics.log_stats();
        Ok(RunSummary {
            state: state.into_final(),
            lines_skipped,
        })
    }

    /// Reads chunks in order until the source runs dry or the run is settled
    fn produce<R: BufRead>(
        &self,
        mut source: CandidateSource<R>,
        sender: Sender<Chunk>,
        state: &SharedSearchState,
    ) -> u64 {
        loop {
            if state.is_found() {
                debug!("Match recorded, no later chunk can improve it; producer stopping");
                break;
            }
            if state.check_deadline() {
                debug!("Run cancelled, producer stopping");
                break;
            }

            match source.next_chunk() {
                Ok(Some(chunk)) => {
                    self.metrics.record_chunk_created();
                    trace!("Dispatching chunk {}", chunk.index);
                    // Blocks while the queue is full
                    if let Err(SendError(_chunk)) = sender.send(chunk) {
                        self.metrics.record_chunk_released(0);
                        break;
                    }
                }
                Ok(None) => {
                    debug!(
                        "Wordlist exhausted after {} candidates",
                        source.candidates_emitted()
                    );
                    break;
                }
                Err(e) => {
                    error!("{}", e);
                    state.fail(e);
                    break;
                }
            }
        }
        source.skipped_lines()
    }

    /// Worker side: drains the queue on the current rayon pool
    fn consume(&self, receiver: Receiver<Chunk>, state: &SharedSearchState) {
        receiver
            .into_iter()
            .par_bridge()
            .for_each(|chunk| self.process_chunk(chunk, state));
    }

    fn process_chunk(&self, chunk: Chunk, state: &SharedSearchState) {
        let relevant = chunk
            .first_line_index()
            .is_some_and(|first| state.can_improve(first));

        let checked = if !relevant || state.check_deadline() {
            trace!("Abandoning chunk {}", chunk.index);
            0
        } else {
            match panic::catch_unwind(AssertUnwindSafe(|| self.scan_chunk(&chunk, state))) {
                Ok(checked) => checked,
                Err(payload) => {
                    let msg = format!(
                        "worker panicked on chunk {}: {}",
                        chunk.index,
                        panic_message(payload.as_ref())
                    );
                    error!("{}", msg);
                    state.fail(CrackError::worker_failure(msg));
                    0
                }
            }
        };

        self.metrics.record_chunk_released(checked);
    }

    /// Checks candidates in file order; returns how many were hashed
    fn scan_chunk(&self, chunk: &Chunk, state: &SharedSearchState) -> u64 {
        let mut checked = 0;
        for candidate in &chunk.candidates {
            if state.is_cancelled() || !state.can_improve(candidate.line_index) {
                break;
            }
            if checked > 0 && checked % DEADLINE_CHECK_INTERVAL == 0 && state.check_deadline() {
                break;
            }

            checked += 1;
            if self.matcher.is_match(&candidate.text) {
                if state.try_record(candidate) {
                    info!(
                        "Match at line {} in chunk {}",
                        candidate.line_index, chunk.index
                    );
                }
                // Nothing later in this chunk can beat it
                break;
            }
        }
        checked
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

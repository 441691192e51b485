//! Parallel dictionary search.
//!
//! A run is split into three cooperating parts:
//!
//! 1. **Producer**: one thread streams the wordlist through a
//!    [`CandidateSource`] and pushes ordered chunks onto a bounded queue. When
//!    the queue is full it blocks, which keeps memory proportional to
//!    `batch_size * queue_capacity` whatever the wordlist size.
//! 2. **Workers**: a rayon pool of `thread_count` threads pulls chunks, hashes
//!    each candidate and records matches in the [`SharedSearchState`].
//! 3. **Reporter**: samples throughput on a timer and builds the final
//!    [`CrackReport`].
//!
//! Chunks finish out of order, but a match only replaces the recorded one
//! when it sits on an earlier line, and chunks before the recorded line are
//! always drained. The result is therefore the one a sequential scan returns.
//!
//! ```rust,ignore
//! let config = CrackConfig::new("5f4dcc3b5aa765d61d8327deb882cf99", "rockyou.txt");
//! match crack(&config).outcome {
//!     SearchOutcome::Found { candidate, .. } => println!("{}", candidate.text),
//!     other => eprintln!("{}", other),
//! }
//! ```
pub mod coordinator;
pub mod state;

pub use coordinator::{CandidateMatcher, CoordinatorSettings, SearchCoordinator};
pub use state::SharedSearchState;

use state::FinalState;

use std::io::BufRead;
use std::sync::Arc;
use tracing::{info, warn};

use crate::algorithm::{Algorithm, TargetHash};
use crate::config::CrackConfig;
use crate::metrics::SearchMetrics;
use crate::reporter::{ProgressCallback, ProgressSnapshot, Reporter};
use crate::results::{CrackReport, SearchOutcome};
use crate::wordlist::CandidateSource;

/// Runs a complete attack described by `config`
pub fn crack(config: &CrackConfig) -> CrackReport {
    run(config, None)
}

/// Like [`crack`], calling `on_progress` every `progress_interval_ms`
pub fn crack_with_progress<F>(config: &CrackConfig, on_progress: F) -> CrackReport
where
    F: Fn(&ProgressSnapshot) + Send + Sync + 'static,
{
    run(config, Some(Arc::new(on_progress)))
}

fn run(config: &CrackConfig, progress: Option<ProgressCallback>) -> CrackReport {
    // Configuration errors are reported before the wordlist is touched
    if let Err(e) = config.validate() {
        warn!("{}", e);
        return CrackReport::early_failure(&e);
    }

    let target = match TargetHash::parse(&config.target_hash) {
        Ok(target) => target,
        Err(e) => {
            warn!("{}", e);
            return CrackReport::early_failure(&e);
        }
    };
    info!(
        "Detected algorithm {} for target {}",
        target.algorithm(),
        target.raw_hex()
    );

    let source = match CandidateSource::open(&config.wordlist, config.batch_size) {
        Ok(source) => source,
        Err(e) => {
            warn!("{}", e);
            return CrackReport::early_failure(&e);
        }
    };

    crack_source(target, source, config, progress)
}

/// Attacks `target` with candidates from an already opened source.
///
/// Tuning (threads, queue capacity, timeout, progress interval) comes from
/// `config`; its target and wordlist fields are ignored.
pub fn crack_source<R: BufRead + Send>(
    target: TargetHash,
    source: CandidateSource<R>,
    config: &CrackConfig,
    progress: Option<ProgressCallback>,
) -> CrackReport {
    let algorithm = target.algorithm();
    let metrics = SearchMetrics::new();
    let reporter = match progress {
        Some(callback) => {
            Reporter::with_progress(metrics.clone(), config.progress_interval(), callback)
        }
        None => Reporter::new(metrics.clone()),
    };

    let coordinator = SearchCoordinator::with_metrics(target, config.coordinator_settings(), metrics);
    match coordinator.run(source) {
        Ok(summary) => {
            let timed_out = summary.state.timed_out;
            let outcome = settle(summary.state, algorithm);
            reporter.finish(outcome, summary.lines_skipped, timed_out)
        }
        Err(e) => reporter.finish(SearchOutcome::failed(&e), 0, false),
    }
}

/// A fatal error outranks a recorded match: after a failed read the earliest
/// line can no longer be vouched for
fn settle(state: FinalState, algorithm: Algorithm) -> SearchOutcome {
    match (state.failure, state.winner) {
        (Some(e), _) => SearchOutcome::failed(&e),
        (None, Some(candidate)) => SearchOutcome::Found {
            candidate,
            algorithm,
        },
        (None, None) => SearchOutcome::NotFound,
    }
}

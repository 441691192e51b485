use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use tracing::{debug, warn};

use crate::errors::CrackError;
use crate::wordlist::Candidate;

const NO_MATCH: u64 = u64::MAX;

/// State shared by every worker for the lifetime of one run.
///
/// The accepted result is keyed by `line_index`: a match only replaces the
/// recorded one when it comes from an earlier line, so the final result is the
/// same one a sequential scan would find no matter which worker gets there
/// first. `best_line` is the lock-free fast path that workers poll; the slot
/// behind the mutex is only touched when a match is actually found.
#[derive(Debug)]
pub struct SharedSearchState {
    found: AtomicBool,
    best_line: AtomicU64,
    slot: Mutex<Option<Candidate>>,
    cancelled: AtomicBool,
    failure: Mutex<Option<CrackError>>,
    deadline: Option<Instant>,
    timed_out: AtomicBool,
}

/// What a finished run left behind in the shared state
#[derive(Debug)]
pub struct FinalState {
    pub winner: Option<Candidate>,
    pub failure: Option<CrackError>,
    pub timed_out: bool,
}

impl SharedSearchState {
    pub fn new(deadline: Option<Instant>) -> Self {
        Self {
            found: AtomicBool::new(false),
            best_line: AtomicU64::new(NO_MATCH),
            slot: Mutex::new(None),
            cancelled: AtomicBool::new(false),
            failure: Mutex::new(None),
            deadline,
            timed_out: AtomicBool::new(false),
        }
    }

    /// Records `candidate` as the result if it precedes the current one.
    ///
    /// Returns true when the candidate was accepted.
    pub fn try_record(&self, candidate: &Candidate) -> bool {
        let line = candidate.line_index;
        let mut current = self.best_line.load(Ordering::Acquire);
        loop {
            if line >= current {
                return false;
            }
            match self.best_line.compare_exchange_weak(
                current,
                line,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        // Two accepted matches may reach the slot in either order
        {
            let mut slot = lock(&self.slot);
            if slot.as_ref().map_or(true, |held| line < held.line_index) {
                *slot = Some(candidate.clone());
            }
        }
        self.found.store(true, Ordering::Release);
        debug!("Recorded match at line {}", line);
        true
    }

    /// True once any match has been recorded
    pub fn is_found(&self) -> bool {
        self.found.load(Ordering::Acquire)
    }

    /// Line index of the recorded match, if any
    pub fn best_line_index(&self) -> Option<u64> {
        match self.best_line.load(Ordering::Acquire) {
            NO_MATCH => None,
            line => Some(line),
        }
    }

    /// Whether a match on `line_index` could still replace the recorded result
    pub fn can_improve(&self, line_index: u64) -> bool {
        line_index < self.best_line.load(Ordering::Acquire)
    }

    /// Signals every worker and the producer to stop at the next boundary
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Records a fatal error and cancels the run. The first error wins.
    pub fn fail(&self, error: CrackError) {
        {
            let mut failure = lock(&self.failure);
            if failure.is_none() {
                *failure = Some(error);
            }
        }
        self.cancel();
    }

    /// Cancels the run if the deadline has passed; returns true when cancelled
    pub fn check_deadline(&self) -> bool {
        if let Some(deadline) = self.deadline {
            if !self.timed_out.load(Ordering::Relaxed) && Instant::now() >= deadline {
                if !self.timed_out.swap(true, Ordering::AcqRel) {
                    warn!("Search deadline reached, finalizing with the current result");
                }
                self.cancel();
            }
        }
        self.is_cancelled()
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out.load(Ordering::Acquire)
    }

    /// Tears the state down at the end of a run
    pub fn into_final(self) -> FinalState {
        FinalState {
            winner: self.slot.into_inner().unwrap_or_else(|e| e.into_inner()),
            failure: self.failure.into_inner().unwrap_or_else(|e| e.into_inner()),
            timed_out: self.timed_out.into_inner(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

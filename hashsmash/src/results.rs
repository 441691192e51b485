use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::algorithm::Algorithm;
use crate::errors::{CrackError, ErrorKind};
use crate::reporter::rate;
use crate::wordlist::Candidate;

/// Terminal result of a run. Exactly one is produced per run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// The earliest wordlist line whose digest equals the target
    Found {
        candidate: Candidate,
        algorithm: Algorithm,
    },
    /// Every candidate was considered and none matched
    NotFound,
    /// The run was aborted by a fatal error
    Failed { kind: ErrorKind, message: String },
}

impl SearchOutcome {
    pub fn failed(error: &CrackError) -> Self {
        SearchOutcome::Failed {
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found { .. })
    }

    /// The recovered plaintext, if any
    pub fn plaintext(&self) -> Option<&str> {
        match self {
            SearchOutcome::Found { candidate, .. } => Some(&candidate.text),
            _ => None,
        }
    }

    /// The failure kind, if the run failed
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            SearchOutcome::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for SearchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchOutcome::Found {
                candidate,
                algorithm,
            } => write!(
                f,
                "found {} preimage on line {}",
                algorithm, candidate.line_index
            ),
            SearchOutcome::NotFound => write!(f, "not found"),
            SearchOutcome::Failed { kind, message } => write!(f, "failed ({}): {}", kind, message),
        }
    }
}

/// Counters describing one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    /// Candidates hashed (chunks abandoned after a match are not counted)
    pub candidates_processed: u64,
    /// Lines dropped because they were not valid UTF-8
    pub lines_skipped: u64,
    pub chunks_dispatched: u64,
    /// Highest number of chunks alive at once
    pub peak_in_flight_chunks: u64,
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
    pub timed_out: bool,
}

impl RunStats {
    pub fn hashes_per_second(&self) -> f64 {
        rate(self.candidates_processed, self.elapsed)
    }
}

/// Outcome plus statistics, as returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrackReport {
    pub outcome: SearchOutcome,
    pub stats: RunStats,
}

impl CrackReport {
    /// Report for a run that failed before any hashing started
    pub fn early_failure(error: &CrackError) -> Self {
        Self {
            outcome: SearchOutcome::failed(error),
            stats: RunStats::default(),
        }
    }
}

// Serialize Duration as fractional seconds
pub(crate) fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}

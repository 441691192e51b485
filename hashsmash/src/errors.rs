//! Error types for the cracking engine.
//!
//! Every fatal condition a run can hit is a variant of [`CrackError`]. The
//! coarser [`ErrorKind`] is what a finished run reports in
//! [`SearchOutcome::Failed`](crate::results::SearchOutcome::Failed), and it
//! also names the one non-fatal condition (`LineDecodeSkipped`) that is
//! counted rather than raised.
//!
//! Configuration problems (a malformed target or a missing wordlist) are
//! detected before any hashing starts, so a caller can tell them apart from
//! an exhaustive search that simply found nothing:
//!
//! ```rust,ignore
//! match report.outcome {
//!     SearchOutcome::Found { candidate, .. } => println!("{}", candidate.text),
//!     SearchOutcome::NotFound => println!("not found"),
//!     SearchOutcome::Failed { kind, .. } if kind.is_configuration() => exit(2),
//!     SearchOutcome::Failed { .. } => exit(3),
//! }
//! ```
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations
pub type CrackResult<T> = Result<T, CrackError>;

/// Errors that can abort a cracking run
#[derive(Error, Debug)]
pub enum CrackError {
    #[error("Invalid hash format '{input}': {reason}")]
    InvalidHashFormat { input: String, reason: String },
    #[error("Wordlist not found: {0}")]
    WordlistNotFound(PathBuf),
    #[error("Failed to read wordlist {path}: {source}")]
    WordlistReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Worker failure: {0}")]
    WorkerFailure(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Classification of everything that can go wrong during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    InvalidHashFormat,
    WordlistNotFound,
    WordlistReadError,
    LineDecodeSkipped,
    WorkerFailure,
    Configuration,
}

impl ErrorKind {
    /// True for errors caused by bad input that are reported before any hashing
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidHashFormat | ErrorKind::WordlistNotFound | ErrorKind::Configuration
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidHashFormat => "InvalidHashFormat",
            ErrorKind::WordlistNotFound => "WordlistNotFound",
            ErrorKind::WordlistReadError => "WordlistReadError",
            ErrorKind::LineDecodeSkipped => "LineDecodeSkipped",
            ErrorKind::WorkerFailure => "WorkerFailure",
            ErrorKind::Configuration => "Configuration",
        };
        f.write_str(name)
    }
}

impl CrackError {
    pub fn invalid_hash_format(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHashFormat {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn wordlist_not_found(path: impl Into<PathBuf>) -> Self {
        Self::WordlistNotFound(path.into())
    }

    pub fn wordlist_read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WordlistReadError {
            path: path.into(),
            source,
        }
    }

    pub fn worker_failure(msg: impl Into<String>) -> Self {
        Self::WorkerFailure(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Maps the error onto the kind reported in a failed outcome
    pub fn kind(&self) -> ErrorKind {
        match self {
            CrackError::InvalidHashFormat { .. } => ErrorKind::InvalidHashFormat,
            CrackError::WordlistNotFound(_) => ErrorKind::WordlistNotFound,
            CrackError::WordlistReadError { .. } => ErrorKind::WordlistReadError,
            CrackError::WorkerFailure(_) => ErrorKind::WorkerFailure,
            CrackError::ConfigError(_) => ErrorKind::Configuration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let path = Path::new("words.txt");
        let err = CrackError::wordlist_not_found(path);
        assert!(matches!(err, CrackError::WordlistNotFound(_)));

        let err = CrackError::invalid_hash_format("xyz", "not hex");
        assert!(matches!(err, CrackError::InvalidHashFormat { .. }));

        let io = std::io::Error::new(std::io::ErrorKind::Other, "device gone");
        let err = CrackError::wordlist_read_error(path, io);
        assert!(matches!(err, CrackError::WordlistReadError { .. }));

        let err = CrackError::worker_failure("boom");
        assert!(matches!(err, CrackError::WorkerFailure(_)));
    }

    #[test]
    fn test_error_messages() {
        let err = CrackError::invalid_hash_format("abc", "odd number of hex digits");
        assert_eq!(
            err.to_string(),
            "Invalid hash format 'abc': odd number of hex digits"
        );

        let err = CrackError::wordlist_not_found("missing.txt");
        assert_eq!(err.to_string(), "Wordlist not found: missing.txt");

        let err = CrackError::config_error("target hash is required");
        assert_eq!(
            err.to_string(),
            "Configuration error: target hash is required"
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            CrackError::invalid_hash_format("x", "y").kind(),
            ErrorKind::InvalidHashFormat
        );
        assert_eq!(
            CrackError::wordlist_not_found("w").kind(),
            ErrorKind::WordlistNotFound
        );
        assert_eq!(
            CrackError::worker_failure("w").kind(),
            ErrorKind::WorkerFailure
        );

        assert!(ErrorKind::InvalidHashFormat.is_configuration());
        assert!(ErrorKind::WordlistNotFound.is_configuration());
        assert!(!ErrorKind::WordlistReadError.is_configuration());
        assert!(!ErrorKind::WorkerFailure.is_configuration());
    }
}

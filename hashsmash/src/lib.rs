pub mod algorithm;
pub mod config;
pub mod errors;
pub mod hasher;
pub mod metrics;
pub mod reporter;
pub mod results;
pub mod search;
pub mod wordlist;

pub use algorithm::{classify, Algorithm, TargetHash};
pub use config::{CliOverrides, CrackConfig};
pub use errors::{CrackError, CrackResult, ErrorKind};
pub use reporter::{ProgressCallback, ProgressSnapshot};
pub use results::{CrackReport, RunStats, SearchOutcome};
pub use search::{crack, crack_source, crack_with_progress};
pub use wordlist::{Candidate, CandidateSource, Chunk};

use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{CrackError, CrackResult};
use crate::search::coordinator::CoordinatorSettings;

/// Configuration for a cracking run.
///
/// # Configuration Locations
///
/// The configuration can be loaded from multiple locations in order of precedence:
/// 1. Custom config file specified via `--config` flag
/// 2. Local `.hashsmash.yaml` in the current directory
/// 3. Global `$HOME/.config/hashsmash/config.yaml`
///
/// Command-line arguments override all of them (see `merge_with_cli`).
///
/// # Configuration Format
///
/// ```yaml
/// # Worker threads (default: CPU cores)
/// thread_count: 8
///
/// # Candidates per chunk
/// batch_size: 4096
///
/// # Chunks allowed to wait in the work queue
/// queue_capacity: 16
///
/// # Progress sampling period in milliseconds (0 disables)
/// progress_interval_ms: 1000
///
/// # Give up after this many seconds
/// timeout_secs: 600
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "info"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrackConfig {
    /// Hex digest to attack
    #[serde(default)]
    pub target_hash: String,

    /// Newline-delimited wordlist
    #[serde(default)]
    pub wordlist: PathBuf,

    /// Number of worker threads
    /// Defaults to number of CPU cores if not specified
    #[serde(default = "default_thread_count")]
    pub thread_count: NonZeroUsize,

    /// Number of candidates per chunk
    #[serde(default = "default_batch_size")]
    pub batch_size: NonZeroUsize,

    /// Capacity of the bounded chunk queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: NonZeroUsize,

    /// Period of progress samples in milliseconds, 0 disables them
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// Optional wall-clock limit in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_batch_size() -> NonZeroUsize {
    NonZeroUsize::new(4096).unwrap_or(NonZeroUsize::MIN)
}

fn default_queue_capacity() -> NonZeroUsize {
    default_thread_count().saturating_mul(NonZeroUsize::new(2).unwrap_or(NonZeroUsize::MIN))
}

fn default_progress_interval_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for CrackConfig {
    fn default() -> Self {
        Self {
            target_hash: String::new(),
            wordlist: PathBuf::new(),
            thread_count: default_thread_count(),
            batch_size: default_batch_size(),
            queue_capacity: default_queue_capacity(),
            progress_interval_ms: default_progress_interval_ms(),
            timeout_secs: None,
            log_level: default_log_level(),
        }
    }
}

impl CrackConfig {
    /// Creates a configuration with default tuning for the given inputs
    pub fn new(target_hash: impl Into<String>, wordlist: impl Into<PathBuf>) -> Self {
        Self {
            target_hash: target_hash.into(),
            wordlist: wordlist.into(),
            ..Default::default()
        }
    }

    /// Loads configuration from the default locations plus an optional file
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            // Global config
            dirs::config_dir().map(|p| p.join("hashsmash/config.yaml")),
            // Local config
            Some(PathBuf::from(".hashsmash.yaml")),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicit file must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder.build()?.try_deserialize()
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli_config: CliOverrides) -> Self {
        // CLI values take precedence over config file values
        if let Some(target) = cli_config.target_hash {
            self.target_hash = target;
        }
        if let Some(wordlist) = cli_config.wordlist {
            self.wordlist = wordlist;
        }
        if let Some(threads) = cli_config.thread_count {
            self.thread_count = threads;
        }
        if let Some(batch) = cli_config.batch_size {
            self.batch_size = batch;
        }
        if let Some(capacity) = cli_config.queue_capacity {
            self.queue_capacity = capacity;
        }
        if let Some(interval) = cli_config.progress_interval_ms {
            self.progress_interval_ms = interval;
        }
        if cli_config.timeout_secs.is_some() {
            self.timeout_secs = cli_config.timeout_secs;
        }
        if let Some(level) = cli_config.log_level {
            self.log_level = level;
        }
        self
    }

    /// Checks that both required inputs are present
    pub fn validate(&self) -> CrackResult<()> {
        if self.target_hash.trim().is_empty() {
            return Err(CrackError::config_error("target hash is required"));
        }
        if self.wordlist.as_os_str().is_empty() {
            return Err(CrackError::config_error("wordlist path is required"));
        }
        Ok(())
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            thread_count: self.thread_count,
            queue_capacity: self.queue_capacity,
            timeout: self.timeout(),
        }
    }
}

/// Values given on the command line; `None` keeps the configured value
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub target_hash: Option<String>,
    pub wordlist: Option<PathBuf>,
    pub thread_count: Option<NonZeroUsize>,
    pub batch_size: Option<NonZeroUsize>,
    pub queue_capacity: Option<NonZeroUsize>,
    pub progress_interval_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub log_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_load_config_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let config_content = r#"
            target_hash: "5f4dcc3b5aa765d61d8327deb882cf99"
            wordlist: "rockyou.txt"
            thread_count: 4
            batch_size: 512
            queue_capacity: 8
            progress_interval_ms: 250
            timeout_secs: 30
            log_level: "debug"
        "#;

        let mut file = File::create(&config_path).unwrap();
        file.write_all(config_content.as_bytes()).unwrap();

        let config = CrackConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.target_hash, "5f4dcc3b5aa765d61d8327deb882cf99");
        assert_eq!(config.wordlist, PathBuf::from("rockyou.txt"));
        assert_eq!(config.thread_count, NonZeroUsize::new(4).unwrap());
        assert_eq!(config.batch_size, NonZeroUsize::new(512).unwrap());
        assert_eq!(config.queue_capacity, NonZeroUsize::new(8).unwrap());
        assert_eq!(config.progress_interval(), Duration::from_millis(250));
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_default_values() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let mut file = File::create(&config_path).unwrap();
        file.write_all(b"log_level: \"warn\"\n").unwrap();

        let config = CrackConfig::load_from(Some(&config_path)).unwrap();
        assert!(config.target_hash.is_empty());
        assert_eq!(
            config.thread_count,
            NonZeroUsize::new(num_cpus::get()).unwrap()
        );
        assert_eq!(config.batch_size, NonZeroUsize::new(4096).unwrap());
        assert_eq!(config.progress_interval_ms, 1000);
        assert_eq!(config.timeout_secs, None);
    }

    #[test]
    fn test_merge_with_cli() {
        let file_config = CrackConfig {
            thread_count: NonZeroUsize::new(4).unwrap(),
            batch_size: NonZeroUsize::new(100).unwrap(),
            timeout_secs: Some(60),
            log_level: "info".to_string(),
            ..CrackConfig::new("aa", "file.txt")
        };

        let merged = file_config.merge_with_cli(CliOverrides {
            target_hash: Some("bb".to_string()),
            thread_count: Some(NonZeroUsize::new(8).unwrap()),
            ..Default::default()
        });

        assert_eq!(merged.target_hash, "bb"); // CLI value
        assert_eq!(merged.wordlist, PathBuf::from("file.txt")); // File value
        assert_eq!(merged.thread_count, NonZeroUsize::new(8).unwrap()); // CLI value
        assert_eq!(merged.batch_size, NonZeroUsize::new(100).unwrap()); // File value
        assert_eq!(merged.timeout_secs, Some(60)); // File value
        assert_eq!(merged.log_level, "info"); // File value
    }

    #[test]
    fn test_validate() {
        assert!(CrackConfig::new("abc", "words.txt").validate().is_ok());
        assert!(CrackConfig::new("  ", "words.txt").validate().is_err());
        assert!(CrackConfig::new("abc", "").validate().is_err());
    }

    #[test]
    fn test_invalid_config() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let mut file = File::create(&config_path).unwrap();
        file.write_all(b"thread_count: \"many\"\nbatch_size: 0\n").unwrap();

        let result = CrackConfig::load_from(Some(&config_path));
        assert!(result.is_err(), "Expected error loading invalid config");
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = CrackConfig::load_from(Some(Path::new("nonexistent.yaml")));
        assert!(result.is_err());
    }
}

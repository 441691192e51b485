use clap::{Parser, ValueEnum};
use colored::Colorize;
use hashsmash::{
    crack, crack_with_progress, CliOverrides, CrackConfig, CrackReport, ProgressSnapshot,
    SearchOutcome,
};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const EXIT_FOUND: u8 = 0;
const EXIT_NOT_FOUND: u8 = 1;
const EXIT_CONFIG: u8 = 2;
const EXIT_RUNTIME: u8 = 3;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Target digest in hex (MD5, SHA-1 or SHA-256, picked by length)
    #[arg(short = 'H', long = "hash")]
    hash: Option<String>,

    /// Newline-delimited wordlist to try
    #[arg(short = 'w', long)]
    wordlist: Option<PathBuf>,

    /// Number of worker threads
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// Candidates per chunk
    #[arg(long)]
    batch_size: Option<NonZeroUsize>,

    /// Chunks allowed to wait for a worker
    #[arg(long)]
    queue_capacity: Option<NonZeroUsize>,

    /// Give up after this long (e.g. 90s, 10m)
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Progress period in milliseconds (0 disables)
    #[arg(long)]
    progress_interval: Option<u64>,

    /// Path to a YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset (trace|debug|info|warn|error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output format of the final result
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            target_hash: self.hash.clone(),
            wordlist: self.wordlist.clone(),
            thread_count: self.threads,
            batch_size: self.batch_size,
            queue_capacity: self.queue_capacity,
            progress_interval_ms: self.progress_interval,
            timeout_secs: self.timeout.map(|t| t.as_secs().max(1)),
            log_level: self.log_level.clone(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match CrackConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config.merge_with_cli(cli.overrides()),
        Err(e) => {
            eprintln!("{} {}", "[!]".red(), e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    // Applies to paths from config files as well as the command line
    config.wordlist = expand_home(&config.wordlist);

    init_logging(&config.log_level);
    debug!("Effective configuration: {:?}", config);

    let report = match cli.format {
        OutputFormat::Json => crack(&config),
        OutputFormat::Text => run_with_progress(&config),
    };

    match cli.format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => print_text(&report),
    }

    ExitCode::from(exit_code(&report.outcome))
}

fn init_logging(level: &str) {
    // Logs share stderr with error lines; stdout carries progress and the result
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Replaces a leading `~` with the home directory
fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

fn run_with_progress(config: &CrackConfig) -> CrackReport {
    if config.progress_interval_ms == 0 {
        return crack(config);
    }

    if std::io::stdout().is_terminal() {
        let spinner = ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout());
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(120));

        let bar = spinner.clone();
        let report = crack_with_progress(config, move |snapshot| {
            bar.set_message(progress_message(snapshot));
        });
        spinner.finish_and_clear();
        report
    } else {
        crack_with_progress(config, |snapshot| {
            println!("[*] {}", progress_message(snapshot));
        })
    }
}

fn progress_message(snapshot: &ProgressSnapshot) -> String {
    format!(
        "{} candidates tried ({:.0} H/s)",
        snapshot.candidates_processed, snapshot.hashes_per_second
    )
}

fn print_text(report: &CrackReport) {
    let stats = &report.stats;
    if let SearchOutcome::Failed { message, .. } = &report.outcome {
        eprintln!("{} {}", "[!]".red(), message);
        return;
    }

    if stats.lines_skipped > 0 {
        println!(
            "[*] Skipped {} lines that were not valid UTF-8",
            stats.lines_skipped
        );
    }
    if stats.timed_out {
        println!("[*] Time limit reached before the wordlist was exhausted");
    }
    // Sub-millisecond precision is noise here
    let elapsed = Duration::from_millis(stats.elapsed.as_millis() as u64);
    println!("[*] Total time: {}", humantime::format_duration(elapsed));
    println!(
        "[*] Speed: {:.0} H/s ({} candidates)",
        stats.hashes_per_second(),
        stats.candidates_processed
    );

    match &report.outcome {
        SearchOutcome::Found { candidate, .. } => {
            println!("{} Password found: {}", "[+]".green(), candidate.text);
        }
        _ => println!("{} Password not found in wordlist.", "[-]".yellow()),
    }
}

fn print_json(report: &CrackReport) {
    match serde_json::to_string(report) {
        Ok(line) => println!("{}", line),
        Err(e) => eprintln!("{} Failed to encode report: {}", "[!]".red(), e),
    }
}

fn exit_code(outcome: &SearchOutcome) -> u8 {
    match outcome {
        SearchOutcome::Found { .. } => EXIT_FOUND,
        SearchOutcome::NotFound => EXIT_NOT_FOUND,
        SearchOutcome::Failed { kind, .. } if kind.is_configuration() => EXIT_CONFIG,
        SearchOutcome::Failed { .. } => EXIT_RUNTIME,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashsmash::{Candidate, CrackError};

    #[test]
    fn test_expand_home() {
        let plain = PathBuf::from("words.txt");
        assert_eq!(expand_home(&plain), plain);

        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_home(Path::new("~/lists/rockyou.txt")),
                home.join("lists/rockyou.txt")
            );
        }
    }

    #[test]
    fn test_exit_codes() {
        let found = SearchOutcome::Found {
            candidate: Candidate::new("x", 0),
            algorithm: hashsmash::Algorithm::Md5,
        };
        assert_eq!(exit_code(&found), EXIT_FOUND);
        assert_eq!(exit_code(&SearchOutcome::NotFound), EXIT_NOT_FOUND);
        assert_eq!(
            exit_code(&SearchOutcome::failed(&CrackError::wordlist_not_found("w"))),
            EXIT_CONFIG
        );
        assert_eq!(
            exit_code(&SearchOutcome::failed(&CrackError::WorkerFailure(
                "boom".to_string()
            ))),
            EXIT_RUNTIME
        );
    }
}

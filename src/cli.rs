//! Command-line interface definitions for hashsoak.
//!
//! This module defines all CLI arguments, subcommands, and options using the clap derive API.
//! Global options (verbosity, config file, log file) apply to every subcommand.
//!
//! # Example
//!
//! ```bash
//! # Soak the default store for ten minutes with pooled connections
//! hashsoak run --duration 10m
//!
//! # Parity run: open and close a connection per operation
//! hashsoak run --per-call --cycles 100000
//!
//! # Replay a previous run's key sequence and emit JSON
//! hashsoak run --seed 1697040000123456789 --cycles 5000 --output json
//!
//! # Row count of an existing store
//! hashsoak stats --db ./db.sqlite
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{Config, StrategyKind};
use crate::driver::ErrorPolicy;

/// Soak-test harness for a SQLite lookup/upsert path.
///
/// Repeatedly generates a random key, looks it up, and upserts it, reporting
/// completed cycles and the final row count.
#[derive(Debug, Parser)]
#[command(name = "hashsoak")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Report errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Append log output to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Do not write a log file
    #[arg(long, global = true, conflicts_with = "log_file")]
    pub no_log_file: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for hashsoak.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Initialize the store and drive lookup/save cycles
    Run(RunArgs),
    /// Initialize the store and exit
    Init(StoreArgs),
    /// Print the row count of an existing store
    Stats(StatsArgs),
    /// Print the effective configuration as TOML
    Config,
}

/// Store location shared by subcommands.
#[derive(Debug, Args)]
pub struct StoreArgs {
    /// Path to the SQLite store file
    #[arg(long = "db", value_name = "PATH")]
    pub database: Option<PathBuf>,
}

/// Arguments for the run subcommand.
#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Stop after this long (e.g., 90, 90s, 5m, 2h)
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Stop after this many cycles
    #[arg(long, value_name = "N")]
    pub cycles: Option<u64>,

    /// Seed for the key generator (defaults to the current time)
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Keep up to N idle connections between operations
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub pool_size: Option<u64>,

    /// Open and close a connection for every operation
    #[arg(long, conflicts_with = "pool_size")]
    pub per_call: bool,

    /// SQLite busy timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub busy_timeout: Option<u64>,

    /// Log storage errors and keep going instead of ending the run
    #[arg(long)]
    pub continue_on_error: bool,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the stats subcommand.
#[derive(Debug, Args)]
pub struct StatsArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl Cli {
    /// Apply global flags on top of loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if self.no_log_file {
            config.log_file = None;
        } else if let Some(ref path) = self.log_file {
            config.log_file = Some(path.clone());
        }
    }
}

impl StoreArgs {
    /// Apply the store path on top of loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(ref path) = self.database {
            config.database = path.clone();
        }
    }
}

impl RunArgs {
    /// Apply run flags on top of loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        self.store.apply_overrides(config);
        if let Some(duration) = self.duration {
            config.duration_secs = Some(duration.as_secs());
        }
        if let Some(cycles) = self.cycles {
            config.max_cycles = Some(cycles);
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if self.per_call {
            config.strategy = StrategyKind::PerCall;
        } else if let Some(size) = self.pool_size {
            config.strategy = StrategyKind::Pooled;
            config.pool_size = usize::try_from(size).unwrap_or(usize::MAX);
        }
        if let Some(ms) = self.busy_timeout {
            config.busy_timeout_ms = ms;
        }
        if self.continue_on_error {
            config.on_error = ErrorPolicy::Continue;
        }
    }
}

/// Parse a human-readable duration into a [`Duration`].
///
/// Supports suffixes: s, m, h (case-insensitive). Numbers without suffix are
/// treated as seconds.
///
/// # Examples
///
/// ```
/// use hashsoak::cli::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("90").unwrap(), Duration::from_secs(90));
/// assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
/// assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
/// ```
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// or an unknown suffix, or if the duration is zero.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Duration cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => (&s[..idx], s[idx..].trim().to_lowercase()),
        None => (s, String::new()),
    };

    let num: u64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "s" | "sec" | "secs" => 1,
        "m" | "min" | "mins" => 60,
        "h" | "hr" | "hrs" => 3_600,
        _ => return Err(format!("Unknown duration suffix: '{suffix}'")),
    };

    let secs = num
        .checked_mul(multiplier)
        .ok_or_else(|| format!("Duration too large: '{s}'"))?;
    if secs == 0 {
        return Err("Duration must be greater than zero".to_string());
    }

    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_seconds() {
        assert_eq!(parse_duration("45").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration(" 45 S ").unwrap(), Duration::from_secs(45));
    }

    #[test]
    fn test_parse_duration_minutes_hours() {
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("5min").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7_200));
    }

    #[test]
    fn test_parse_duration_errors() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("5d").is_err());
        assert!(parse_duration("-5s").is_err());
        assert!(parse_duration("0").is_err());
        assert!(parse_duration("1.5h").is_err());
    }

    #[test]
    fn test_cli_parse_help() {
        let result = Cli::try_parse_from(["hashsoak", "--help"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_run_basic() {
        let cli = Cli::try_parse_from(["hashsoak", "run"]).unwrap();
        assert_eq!(cli.verbose, 0);
        match cli.command {
            Commands::Run(args) => {
                assert!(args.store.database.is_none());
                assert_eq!(args.output, OutputFormat::Text);
                assert!(!args.per_call);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_run_full() {
        let cli = Cli::try_parse_from([
            "hashsoak",
            "-v",
            "run",
            "--db",
            "/tmp/x.sqlite",
            "--duration",
            "2m",
            "--cycles",
            "10",
            "--seed",
            "7",
            "--pool-size",
            "8",
            "--continue-on-error",
            "--output",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.store.database, Some(PathBuf::from("/tmp/x.sqlite")));
                assert_eq!(args.duration, Some(Duration::from_secs(120)));
                assert_eq!(args.cycles, Some(10));
                assert_eq!(args.seed, Some(7));
                assert_eq!(args.pool_size, Some(8));
                assert!(args.continue_on_error);
                assert_eq!(args.output, OutputFormat::Json);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_per_call_conflicts_with_pool_size() {
        let result =
            Cli::try_parse_from(["hashsoak", "run", "--per-call", "--pool-size", "2"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_zero_pool_size_rejected() {
        let result = Cli::try_parse_from(["hashsoak", "run", "--pool-size", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["hashsoak", "-q", "-v", "run"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_run_overrides_config() {
        let cli = Cli::try_parse_from([
            "hashsoak",
            "--no-log-file",
            "run",
            "--db",
            "soak.sqlite",
            "--per-call",
            "--duration",
            "30s",
            "--busy-timeout",
            "100",
            "--continue-on-error",
        ])
        .unwrap();
        let mut config = Config::default();
        cli.apply_overrides(&mut config);
        let Commands::Run(ref args) = cli.command else {
            panic!("Expected Run command");
        };
        args.apply_overrides(&mut config);

        assert_eq!(config.database, PathBuf::from("soak.sqlite"));
        assert_eq!(config.strategy, StrategyKind::PerCall);
        assert_eq!(config.duration_secs, Some(30));
        assert_eq!(config.busy_timeout_ms, 100);
        assert_eq!(config.on_error, ErrorPolicy::Continue);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_pool_size_selects_pooled() {
        let cli = Cli::try_parse_from(["hashsoak", "run", "--pool-size", "3"]).unwrap();
        let mut config = Config {
            strategy: StrategyKind::PerCall,
            ..Config::default()
        };
        if let Commands::Run(ref args) = cli.command {
            args.apply_overrides(&mut config);
        }
        assert_eq!(config.strategy, StrategyKind::Pooled);
        assert_eq!(config.pool_size, 3);
    }

    #[test]
    fn test_cli_parse_stats_and_config() {
        let cli = Cli::try_parse_from(["hashsoak", "stats", "--db", "a.sqlite"]).unwrap();
        assert!(matches!(cli.command, Commands::Stats(_)));

        let cli = Cli::try_parse_from(["hashsoak", "config"]).unwrap();
        assert!(matches!(cli.command, Commands::Config));
    }
}

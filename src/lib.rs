//! hashsoak - SQLite lookup/upsert soak harness
//!
//! Repeatedly generates a random key, looks it up in a single-table SQLite
//! store and upserts it with a derived filename and timestamp. Each operation
//! acquires and releases its own connection (or borrows one from a bounded
//! idle set), so a long run exercises both the insert/lookup path and the
//! connection lifecycle.

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod keygen;
pub mod logging;
pub mod progress;
pub mod report;
pub mod signal;
pub mod store;

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::{Cli, Commands, OutputFormat, RunArgs, StatsArgs};
use crate::config::Config;
use crate::driver::{CycleDriver, DriverConfig};
use crate::error::ExitCode;
use crate::keygen::KeyGenerator;
use crate::progress::Progress;
use crate::report::{RunOutcome, RunReport};

/// Run the application for parsed CLI arguments and return the exit code.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the store cannot be
/// initialized or opened, or output cannot be written. A storage error during
/// a run is not an `Err`: it is reported in the run summary and mapped to
/// [`ExitCode::StorageFailure`].
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    if cli.no_color {
        yansi::disable();
    }

    let mut config = match cli.config {
        Some(ref path) => Config::load_from_path(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    cli.apply_overrides(&mut config);
    match cli.command {
        Commands::Run(ref args) => args.apply_overrides(&mut config),
        Commands::Init(ref args) => args.apply_overrides(&mut config),
        Commands::Stats(ref args) => args.store.apply_overrides(&mut config),
        Commands::Config => {}
    }
    config.validate().context("Invalid configuration")?;

    let log_file = match cli.command {
        Commands::Config => None,
        _ => config.log_file.as_deref(),
    };
    logging::init_logging(cli.verbose, cli.quiet, log_file);

    match cli.command {
        Commands::Run(ref args) => run_soak(&cli, args, &config),
        Commands::Init(_) => init_store(&config),
        Commands::Stats(ref args) => print_stats(args, &config),
        Commands::Config => {
            print!("{}", config.to_toml().context("Failed to render configuration")?);
            Ok(ExitCode::Success)
        }
    }
}

fn run_soak(cli: &Cli, args: &RunArgs, config: &Config) -> Result<ExitCode> {
    let store = store::initialize_with(&config.database, config.store_options())
        .context("Failed to initialize database")?;

    let handler = signal::install_handler()?;

    let keys = match config.seed {
        Some(seed) => KeyGenerator::from_seed(seed),
        None => KeyGenerator::from_clock(),
    }
    .with_length(config.key_length);

    let driver_config = DriverConfig::default()
        .with_limits(config.run_limits())
        .with_error_policy(config.on_error)
        .with_filename_suffix(config.filename_suffix.clone())
        .with_shutdown_flag(handler.get_flag());

    let progress = Arc::new(Progress::new(cli.quiet || args.output == OutputFormat::Json));

    let report = CycleDriver::new(&store, keys, driver_config)
        .with_progress(progress)
        .run();

    print_report(&report, args.output)?;

    Ok(match report.outcome {
        RunOutcome::Completed => ExitCode::Success,
        RunOutcome::Interrupted => ExitCode::Interrupted,
        RunOutcome::Failed { .. } => ExitCode::StorageFailure,
    })
}

fn print_report(report: &RunReport, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Text => println!("{}", report.to_text()),
        OutputFormat::Json => println!(
            "{}",
            report.to_json().context("Failed to serialize run report")?
        ),
    }
    Ok(())
}

fn init_store(config: &Config) -> Result<ExitCode> {
    let store = store::initialize_with(&config.database, config.store_options())
        .context("Failed to initialize database")?;
    let rows = store.count().context("Failed to count rows")?;
    println!("Store ready at {} ({} rows)", store.path().display(), rows);
    Ok(ExitCode::Success)
}

/// Row count of an existing store, as printed by `stats --output json`.
#[derive(Debug, Serialize)]
struct StoreStats<'a> {
    database: &'a std::path::Path,
    rows: u64,
}

fn print_stats(args: &StatsArgs, config: &Config) -> Result<ExitCode> {
    let rows = store::count(&config.database)
        .with_context(|| format!("Failed to read {}", config.database.display()))?;

    match args.output {
        OutputFormat::Text => println!("{}: {} rows", config.database.display(), rows),
        OutputFormat::Json => {
            let stats = StoreStats {
                database: &config.database,
                rows,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&stats).context("Failed to serialize stats")?
            );
        }
    }
    Ok(ExitCode::Success)
}

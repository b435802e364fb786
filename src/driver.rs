//! Cycle driver: generate a key, look it up, save it, repeat.
//!
//! The driver owns the key generator and checks run limits and the shutdown
//! flag between cycles, never inside one. Once the loop ends it counts the
//! rows left in the store and returns a [`RunReport`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::keygen::KeyGenerator;
use crate::progress::ProgressCallback;
use crate::report::{RunOutcome, RunReport};
use crate::store::{StorageError, StoreHandle};

/// Default suffix appended to a key to derive its filename.
pub const DEFAULT_FILENAME_SUFFIX: &str = ".temp";

/// Bounds on run length. Both unset means run until error or interruption.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunLimits {
    /// Stop once this much wall-clock time has elapsed.
    pub duration: Option<Duration>,
    /// Stop once this many cycles have been attempted.
    pub max_cycles: Option<u64>,
}

impl RunLimits {
    /// No bound.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Bound by wall-clock duration.
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Bound by number of attempted cycles.
    #[must_use]
    pub fn with_max_cycles(mut self, max_cycles: u64) -> Self {
        self.max_cycles = Some(max_cycles);
        self
    }

    /// True if neither bound is set.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.duration.is_none() && self.max_cycles.is_none()
    }

    fn reached(&self, attempts: u64, elapsed: Duration) -> bool {
        self.max_cycles.is_some_and(|max| attempts >= max)
            || self.duration.is_some_and(|limit| elapsed >= limit)
    }
}

/// What the driver does when a cycle fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// End the run on the first storage error.
    #[default]
    Abort,
    /// Log the error and continue with the next key.
    Continue,
}

/// Configuration for a [`CycleDriver`].
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Run length bounds.
    pub limits: RunLimits,
    /// Reaction to storage errors.
    pub error_policy: ErrorPolicy,
    /// Suffix appended to the key to form the saved filename.
    pub filename_suffix: String,
    /// Shutdown flag checked between cycles.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            limits: RunLimits::unbounded(),
            error_policy: ErrorPolicy::Abort,
            filename_suffix: DEFAULT_FILENAME_SUFFIX.to_string(),
            shutdown_flag: None,
        }
    }
}

impl DriverConfig {
    /// Set run limits.
    #[must_use]
    pub fn with_limits(mut self, limits: RunLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the error policy.
    #[must_use]
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Set the filename suffix.
    #[must_use]
    pub fn with_filename_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.filename_suffix = suffix.into();
        self
    }

    /// Set the shutdown flag.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }
}

/// Drives lookup/save cycles against a store.
///
/// # Example
///
/// ```no_run
/// use hashsoak::driver::{CycleDriver, DriverConfig, RunLimits};
/// use hashsoak::keygen::KeyGenerator;
/// use hashsoak::store;
///
/// let store = store::initialize("./db.sqlite").unwrap();
/// let config = DriverConfig::default().with_limits(RunLimits::unbounded().with_max_cycles(1_000));
/// let report = CycleDriver::new(&store, KeyGenerator::from_seed(1), config).run();
/// println!("{} cycles, {:?} rows", report.cycles, report.final_row_count);
/// ```
pub struct CycleDriver<'a> {
    store: &'a StoreHandle,
    keys: KeyGenerator,
    config: DriverConfig,
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl<'a> CycleDriver<'a> {
    /// Create a driver over `store`, drawing keys from `keys`.
    #[must_use]
    pub fn new(store: &'a StoreHandle, keys: KeyGenerator, config: DriverConfig) -> Self {
        Self {
            store,
            keys,
            config,
            progress: None,
        }
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run cycles until a limit, a shutdown request, or (under
    /// [`ErrorPolicy::Abort`]) a storage error ends the run.
    ///
    /// Never fails: errors are recorded in the returned report.
    pub fn run(mut self) -> RunReport {
        let limits = self.config.limits;
        log::info!(
            "Starting run against {} ({}, seed {}, limits: {})",
            self.store.path().display(),
            self.store.strategy(),
            self.keys.seed(),
            describe_limits(&limits)
        );
        if let Some(ref progress) = self.progress {
            progress.on_start(&limits);
        }

        let start = Instant::now();
        let mut cycles: u64 = 0;
        let mut hits: u64 = 0;
        let mut errors: u64 = 0;
        let mut outcome = RunOutcome::Completed;

        loop {
            if self.shutdown_requested() {
                log::info!("Shutdown requested, stopping after {} cycles", cycles);
                outcome = RunOutcome::Interrupted;
                break;
            }
            if limits.reached(cycles + errors, start.elapsed()) {
                break;
            }

            match self.cycle() {
                Ok(found) => {
                    cycles += 1;
                    if found {
                        hits += 1;
                    }
                    if let Some(ref progress) = self.progress {
                        progress.on_cycle(cycles, hits);
                    }
                }
                Err(e) => {
                    errors += 1;
                    let attempt = cycles + errors;
                    if let Some(ref progress) = self.progress {
                        progress.on_error(attempt, &e);
                    }
                    match self.config.error_policy {
                        ErrorPolicy::Abort => {
                            log::error!("Cycle {} failed, ending run: {}", attempt, e);
                            outcome = RunOutcome::failed(&e);
                            break;
                        }
                        ErrorPolicy::Continue => {
                            log::error!("Cycle {} failed: {}", attempt, e);
                        }
                    }
                }
            }
        }

        let elapsed = start.elapsed();
        let final_row_count = match self.store.count() {
            Ok(n) => Some(n),
            Err(e) => {
                log::error!("Failed to count rows after run: {}", e);
                None
            }
        };

        let report = RunReport {
            database: self.store.path().to_path_buf(),
            strategy: self.store.strategy(),
            seed: self.keys.seed(),
            cycles,
            hits,
            errors,
            final_row_count,
            elapsed,
            outcome,
        };

        log::info!(
            "Run finished: {} cycles, {} errors, {} rows in {:.2}s",
            report.cycles,
            report.errors,
            report
                .final_row_count
                .map_or_else(|| "unknown".to_string(), |n| n.to_string()),
            elapsed.as_secs_f64()
        );
        if let Some(ref progress) = self.progress {
            progress.on_finish(&report);
        }
        report
    }

    /// One lookup followed by one save. Returns whether the key already existed.
    fn cycle(&mut self) -> Result<bool, StorageError> {
        let hash = self.keys.next_key();
        let found = self.store.lookup(&hash)?;
        if found {
            log::debug!("Hash {} already present, refreshing", hash);
        }
        let filename = format!("{}{}", hash, self.config.filename_suffix);
        self.store.save(&hash, &filename)?;
        Ok(found)
    }

    fn shutdown_requested(&self) -> bool {
        self.config
            .shutdown_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

fn describe_limits(limits: &RunLimits) -> String {
    match (limits.duration, limits.max_cycles) {
        (None, None) => "unbounded".to_string(),
        (Some(d), None) => format!("{}s", d.as_secs_f64()),
        (None, Some(n)) => format!("{n} cycles"),
        (Some(d), Some(n)) => format!("{}s or {n} cycles", d.as_secs_f64()),
    }
}

//! Progress reporting utilities using indicatif.
//!
//! This module provides the [`Progress`] struct which implements [`ProgressCallback`]
//! to display a live cycle counter while a soak run is in flight.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::driver::RunLimits;
use crate::report::RunReport;
use crate::store::StorageError;

/// Progress callback for the cycle driver.
///
/// Implement this trait to receive updates while a run is in flight.
pub trait ProgressCallback: Send + Sync {
    /// Called once before the first cycle.
    fn on_start(&self, limits: &RunLimits);

    /// Called after every completed cycle.
    ///
    /// # Arguments
    ///
    /// * `cycles` - Completed cycles so far
    /// * `hits` - Lookups so far that found an existing key
    fn on_cycle(&self, cycles: u64, hits: u64);

    /// Called when a cycle fails. `attempt` counts successful and failed
    /// cycles, starting at 1.
    fn on_error(&self, _attempt: u64, _error: &StorageError) {}

    /// Called once after the loop ends and the final row count is known.
    fn on_finish(&self, report: &RunReport);
}

/// Progress reporter using indicatif.
///
/// Shows a bar when the run is bounded by a cycle count and a spinner
/// otherwise.
pub struct Progress {
    bar: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, nothing is displayed.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            quiet,
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {pos} cycles ({per_sec}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {per_sec} {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(ref pb) = *guard {
                f(pb);
            }
        }
    }
}

impl ProgressCallback for Progress {
    fn on_start(&self, limits: &RunLimits) {
        if self.quiet {
            return;
        }

        let pb = match limits.max_cycles {
            Some(total) => {
                let pb = ProgressBar::new(total);
                pb.set_style(Self::bar_style());
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(Self::spinner_style());
                pb.enable_steady_tick(Duration::from_millis(100));
                pb
            }
        };
        pb.set_message("0 hits");

        if let Ok(mut bar) = self.bar.lock() {
            *bar = Some(pb);
        }
    }

    fn on_cycle(&self, cycles: u64, hits: u64) {
        if self.quiet {
            return;
        }

        self.with_bar(|pb| {
            pb.set_position(cycles);
            if hits > 0 {
                pb.set_message(format!("{hits} hits"));
            }
        });
    }

    fn on_error(&self, attempt: u64, error: &StorageError) {
        if self.quiet {
            return;
        }

        self.with_bar(|pb| pb.set_message(format!("cycle {attempt} failed: {}", error.kind())));
    }

    fn on_finish(&self, report: &RunReport) {
        if self.quiet {
            return;
        }

        if let Ok(mut bar) = self.bar.lock() {
            if let Some(pb) = bar.take() {
                pb.finish_with_message(format!("{} cycles done", report.cycles));
            }
        }
    }
}

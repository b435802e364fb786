//! Run report produced by the cycle driver, with text and JSON rendering.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use yansi::Paint;

use crate::store::{ConnectionStrategy, StorageError};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The run limit was reached.
    Completed,
    /// Shutdown was requested (Ctrl+C) between cycles.
    Interrupted,
    /// A storage error terminated the run.
    Failed {
        /// Error variant label (see [`StorageError::kind`]).
        kind: String,
        /// Error message.
        message: String,
    },
}

impl RunOutcome {
    pub(crate) fn failed(err: &StorageError) -> Self {
        Self::Failed {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Store file the run worked against.
    pub database: PathBuf,
    /// Connection strategy used.
    pub strategy: ConnectionStrategy,
    /// Key generator seed, for replaying the run.
    pub seed: u64,
    /// Cycles whose lookup and save both succeeded.
    pub cycles: u64,
    /// Lookups that found an existing key.
    pub hits: u64,
    /// Storage errors seen during the run.
    pub errors: u64,
    /// Rows in the store after the run; absent if counting failed.
    pub final_row_count: Option<u64>,
    /// Wall-clock duration of the cycle loop.
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    /// How the run ended.
    pub outcome: RunOutcome,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

impl RunReport {
    /// Completed cycles per second over the whole run.
    #[must_use]
    pub fn cycles_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.cycles as f64 / secs
        } else {
            0.0
        }
    }

    /// Render the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Render the report as human-readable text.
    #[must_use]
    pub fn to_text(&self) -> String {
        let status = match &self.outcome {
            RunOutcome::Completed => "completed".green().to_string(),
            RunOutcome::Interrupted => "interrupted".yellow().to_string(),
            RunOutcome::Failed { kind, message } => {
                format!("{} ({kind}): {message}", "failed".red())
            }
        };
        let rows = self
            .final_row_count
            .map_or_else(|| "unknown".to_string(), |n| n.to_string());

        format!(
            "Run {status}\n\
             Database:    {}\n\
             Strategy:    {}\n\
             Seed:        {}\n\
             Cycles:      {} ({:.1}/s)\n\
             Hits:        {}\n\
             Errors:      {}\n\
             Elapsed:     {:.2}s\n\
             Final rows:  {rows}",
            self.database.display(),
            self.strategy,
            self.seed,
            self.cycles,
            self.cycles_per_sec(),
            self.hits,
            self.errors,
            self.elapsed.as_secs_f64(),
        )
    }
}

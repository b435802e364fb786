//! Application configuration management.
//!
//! Configuration is layered with figment, lowest priority first:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. TOML file (platform config dir, or an explicit `--config` path)
//! 3. Environment variables prefixed with `HASHSOAK_` (e.g. `HASHSOAK_POOL_SIZE=8`)
//! 4. CLI flags, applied by the caller after loading
//!
//! # Example config file
//!
//! ```toml
//! database = "/var/tmp/soak.sqlite"
//! strategy = "pooled"
//! pool_size = 8
//! duration_secs = 600
//! on_error = "continue"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::driver::{ErrorPolicy, RunLimits, DEFAULT_FILENAME_SUFFIX};
use crate::keygen::DEFAULT_KEY_LENGTH;
use crate::store::{ConnectionStrategy, StoreOptions, DEFAULT_BUSY_TIMEOUT};

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "HASHSOAK_";

/// Connection strategy as written in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Open and close a connection for every operation.
    PerCall,
    /// Keep up to `pool_size` idle connections between operations.
    #[default]
    Pooled,
}

/// Errors produced while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The merged configuration could not be extracted.
    #[error("Invalid configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    /// A value is out of range.
    #[error("Invalid value for `{key}`: {reason}")]
    InvalidValue {
        /// Configuration key
        key: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// The platform configuration directory could not be determined.
    #[error("Failed to determine project directories")]
    NoConfigDir,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite store file.
    pub database: PathBuf,
    /// File that receives a copy of log output. `None` (or `""` in a file or
    /// `HASHSOAK_LOG_FILE`) disables it.
    pub log_file: Option<PathBuf>,
    /// Connection strategy.
    pub strategy: StrategyKind,
    /// Maximum idle connections for the pooled strategy.
    pub pool_size: usize,
    /// SQLite busy timeout in milliseconds.
    pub busy_timeout_ms: u64,
    /// Stop the run after this many seconds.
    pub duration_secs: Option<u64>,
    /// Stop the run after this many attempted cycles.
    pub max_cycles: Option<u64>,
    /// Key generator seed; the wall clock is used when unset.
    pub seed: Option<u64>,
    /// Length of generated keys.
    pub key_length: usize,
    /// Suffix appended to keys to form filenames.
    pub filename_suffix: String,
    /// Reaction to storage errors during a run.
    pub on_error: ErrorPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("db.sqlite"),
            log_file: Some(PathBuf::from("app.log")),
            strategy: StrategyKind::Pooled,
            pool_size: 4,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT.as_millis() as u64,
            duration_secs: None,
            max_cycles: None,
            seed: None,
            key_length: DEFAULT_KEY_LENGTH,
            filename_suffix: DEFAULT_FILENAME_SUFFIX.to_string(),
            on_error: ErrorPolicy::Abort,
        }
    }
}

impl Config {
    /// Load configuration from the default platform-specific file (if it
    /// exists) and the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a present file or variable cannot be parsed.
    /// Ranges are not checked here; call [`Config::validate`] once CLI flags
    /// have been applied.
    pub fn load() -> Result<Self, ConfigError> {
        let figment = match Self::default_path() {
            Ok(path) => Self::figment_for(Some(&path)),
            Err(e) => {
                log::debug!("{}, skipping config file", e);
                Self::figment_for(None)
            }
        };
        Self::extract(figment)
    }

    /// Load configuration from a specific file and the environment.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`].
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::extract(Self::figment_for(Some(path.as_ref())))
    }

    fn figment_for(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            log::debug!("Reading configuration from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let mut config: Config = figment.extract().map_err(Box::new)?;
        // TOML and env have no null; an empty path switches the log file off.
        if config
            .log_file
            .as_ref()
            .is_some_and(|path| path.as_os_str().is_empty())
        {
            config.log_file = None;
        }
        Ok(config)
    }

    /// Default platform-specific configuration path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoConfigDir`] if no home directory is known.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let project_dirs =
            ProjectDirs::from("com", "hashsoak", "hashsoak").ok_or(ConfigError::NoConfigDir)?;
        Ok(project_dirs.config_dir().join("config.toml"))
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.strategy == StrategyKind::Pooled && self.pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pool_size",
                reason: "must be at least 1 for the pooled strategy".to_string(),
            });
        }
        if self.key_length == 0 {
            return Err(ConfigError::InvalidValue {
                key: "key_length",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.seed.is_some_and(|seed| i64::try_from(seed).is_err()) {
            return Err(ConfigError::InvalidValue {
                key: "seed",
                reason: format!("must not exceed {}", i64::MAX),
            });
        }
        if self.database.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "database",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Connection strategy derived from `strategy` and `pool_size`.
    #[must_use]
    pub fn connection_strategy(&self) -> ConnectionStrategy {
        match self.strategy {
            StrategyKind::PerCall => ConnectionStrategy::PerCall,
            StrategyKind::Pooled => ConnectionStrategy::Pooled {
                max_idle: self.pool_size,
            },
        }
    }

    /// Store options derived from this configuration.
    #[must_use]
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions::default()
            .with_strategy(self.connection_strategy())
            .with_busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }

    /// Run limits derived from `duration_secs` and `max_cycles`.
    #[must_use]
    pub fn run_limits(&self) -> RunLimits {
        RunLimits {
            duration: self.duration_secs.map(Duration::from_secs),
            max_cycles: self.max_cycles,
        }
    }

    /// Render the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

//! Integration tests for the layered configuration stack: defaults, TOML
//! file, `HASHSOAK_*` environment overrides and CLI flags.

use clap::Parser;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use hashsoak::cli::{Cli, Commands};
use hashsoak::config::{Config, ConfigError, StrategyKind};
use hashsoak::driver::ErrorPolicy;
use hashsoak::store::ConnectionStrategy;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::tempdir;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Clear all HASHSOAK_* environment variables to avoid interference.
fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("HASHSOAK_") {
            std::env::remove_var(key);
        }
    }
}

#[test]
fn test_config_defaults_via_figment() {
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.database, PathBuf::from("db.sqlite"));
    assert_eq!(config.log_file, Some(PathBuf::from("app.log")));
}

#[test]
fn test_config_load_from_toml() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let toml_content = r#"
database = "/var/tmp/soak.sqlite"
strategy = "per_call"
busy_timeout_ms = 1500
duration_secs = 600
seed = 42
filename_suffix = ".bin"
on_error = "continue"
"#;
    fs::write(&config_path, toml_content).unwrap();

    let config = Config::load_from_path(&config_path).unwrap();

    assert_eq!(config.database, PathBuf::from("/var/tmp/soak.sqlite"));
    assert_eq!(config.strategy, StrategyKind::PerCall);
    assert_eq!(config.connection_strategy(), ConnectionStrategy::PerCall);
    assert_eq!(config.store_options().busy_timeout, Duration::from_millis(1500));
    assert_eq!(config.run_limits().duration, Some(Duration::from_secs(600)));
    assert_eq!(config.seed, Some(42));
    assert_eq!(config.filename_suffix, ".bin");
    assert_eq!(config.on_error, ErrorPolicy::Continue);
    // Untouched keys keep their defaults
    assert_eq!(config.key_length, 32);
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();

    let config = Config::load_from_path(temp_dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_env_overrides_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "pool_size = 2\nmax_cycles = 10\n").unwrap();

    std::env::set_var("HASHSOAK_POOL_SIZE", "16");
    let config = Config::load_from_path(&config_path);
    clear_env();

    let config = config.unwrap();
    assert_eq!(config.pool_size, 16);
    assert_eq!(config.max_cycles, Some(10));
    assert_eq!(
        config.connection_strategy(),
        ConnectionStrategy::Pooled { max_idle: 16 }
    );
}

#[test]
fn test_env_provider_lowercases_keys() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    std::env::set_var("HASHSOAK_ON_ERROR", "continue");

    let figment = Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed("HASHSOAK_"));
    let config: Result<Config, _> = figment.extract();
    clear_env();

    assert_eq!(config.unwrap().on_error, ErrorPolicy::Continue);
}

#[test]
fn test_invalid_toml_is_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "strategy = ").unwrap();

    assert!(matches!(
        Config::load_from_path(&config_path),
        Err(ConfigError::Extract(_))
    ));
}

#[test]
fn test_unknown_strategy_is_error() {
    let figment = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::string("strategy = \"shared\""));
    let result: Result<Config, _> = figment.extract();
    assert!(result.is_err());
}

#[test]
fn test_zero_pool_size_in_file_is_checked_after_overrides() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "pool_size = 0\n").unwrap();

    let mut config = Config::load_from_path(&config_path).unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidValue { key: "pool_size", .. })
    ));

    let cli = Cli::try_parse_from(["hashsoak", "run", "--per-call"]).unwrap();
    if let Commands::Run(ref args) = cli.command {
        args.apply_overrides(&mut config);
    }
    assert!(config.validate().is_ok());
    assert_eq!(config.connection_strategy(), ConnectionStrategy::PerCall);
}

#[test]
fn test_empty_log_file_in_file_disables_it() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "log_file = \"\"\n").unwrap();

    let config = Config::load_from_path(&config_path).unwrap();
    assert_eq!(config.log_file, None);
}

#[test]
fn test_seed_beyond_toml_range_fails_validation() {
    let cli = Cli::try_parse_from(["hashsoak", "run", "--seed", "18446744073709551615"]).unwrap();
    let mut config = Config::default();
    if let Commands::Run(ref args) = cli.command {
        args.apply_overrides(&mut config);
    }
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidValue { key: "seed", .. })
    ));
}

#[test]
fn test_cli_flags_override_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        "database = \"from_file.sqlite\"\nstrategy = \"per_call\"\nlog_file = \"file.log\"\n",
    )
    .unwrap();

    let cli = Cli::try_parse_from([
        "hashsoak",
        "--log-file",
        "cli.log",
        "run",
        "--db",
        "from_cli.sqlite",
        "--pool-size",
        "6",
        "--cycles",
        "3",
    ])
    .unwrap();

    let mut config = Config::load_from_path(&config_path).unwrap();
    cli.apply_overrides(&mut config);
    if let Commands::Run(ref args) = cli.command {
        args.apply_overrides(&mut config);
    }

    assert_eq!(config.database, PathBuf::from("from_cli.sqlite"));
    assert_eq!(config.log_file, Some(PathBuf::from("cli.log")));
    assert_eq!(
        config.connection_strategy(),
        ConnectionStrategy::Pooled { max_idle: 6 }
    );
    assert_eq!(config.max_cycles, Some(3));
}

#[test]
fn test_config_round_trips_through_toml() {
    let config = Config {
        seed: Some(7),
        duration_secs: Some(60),
        on_error: ErrorPolicy::Continue,
        ..Config::default()
    };
    let rendered = config.to_toml().unwrap();

    let figment =
        Figment::from(Serialized::defaults(Config::default())).merge(Toml::string(&rendered));
    let parsed: Config = figment.extract().unwrap();
    assert_eq!(parsed, config);
}

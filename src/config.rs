use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::db::classify::ErrorClassifier;
use crate::core::{CerberusError, Result};

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub classifier: Option<ClassifierConfig>,
    pub logging: Option<LoggingConfig>,
}

/// Database and connection pool configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite file, or ":memory:"
    pub path: PathBuf,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// How long `connect` waits for a free pooled connection
    #[serde(default = "default_timeout_ms")]
    pub acquire_timeout_ms: u64,
    /// SQLite busy timeout applied to every connection
    #[serde(default = "default_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default = "default_foreign_keys")]
    pub foreign_keys: bool,
}

/// Error classification overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Extended SQLite result codes treated as duplicate entries
    pub duplicate_codes: Vec<i32>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

fn default_pool_size() -> usize {
    4
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_foreign_keys() -> bool {
    true
}

/// Largest busy timeout SQLite accepts, in milliseconds.
pub const MAX_BUSY_TIMEOUT_MS: u64 = i32::MAX as u64;

impl DatabaseConfig {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        DatabaseConfig {
            path: path.into(),
            pool_size: default_pool_size(),
            acquire_timeout_ms: default_timeout_ms(),
            busy_timeout_ms: default_timeout_ms(),
            foreign_keys: default_foreign_keys(),
        }
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Busy timeout, capped at [`MAX_BUSY_TIMEOUT_MS`].
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms.min(MAX_BUSY_TIMEOUT_MS))
    }

    /// True for `:memory:` and for `file:` URIs naming an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        let path = self.path.to_string_lossy();
        if path == ":memory:" {
            return true;
        }
        match path.strip_prefix("file:") {
            Some(uri) => {
                let (name, query) = uri.split_once('?').unwrap_or((uri, ""));
                name == ":memory:" || query.split('&').any(|option| option == "mode=memory")
            }
            None => false,
        }
    }

    /// Rejects settings the pool or SQLite cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(CerberusError::Config("pool_size must be at least 1".to_string()));
        }
        if self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(CerberusError::Config(format!(
                "busy_timeout_ms must not exceed {}",
                MAX_BUSY_TIMEOUT_MS
            )));
        }
        Ok(())
    }
}

impl Config {
    pub fn from_database(database: DatabaseConfig) -> Self {
        Config {
            database,
            classifier: None,
            logging: None,
        }
    }

    /// Classifier built from the `[classifier]` table, or the default one.
    pub fn error_classifier(&self) -> ErrorClassifier {
        match &self.classifier {
            Some(classifier) => ErrorClassifier::from_codes(classifier.duplicate_codes.iter().copied()),
            None => ErrorClassifier::default(),
        }
    }

    /// Log level from the `[logging]` table, `info` when unset.
    pub fn log_level(&self) -> Result<tracing::Level> {
        let level = self
            .logging
            .as_ref()
            .and_then(|logging| logging.level.as_deref())
            .unwrap_or("info");
        level
            .parse()
            .map_err(|_| CerberusError::Config(format!("unknown log level '{}'", level)))
    }
}

/// Default configuration file location: `<config dir>/cerberus/db.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cerberus").join("db.toml"))
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// let config = cerberus_db::config::load_config("db.toml").expect("Failed to load config");
/// println!("{:?}", config.database.path);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.database.validate()?;
    Ok(config)
}

//! Document store configuration.
//!
//! # Responsibility
//! - Describe where the document store lives and how sessions connect to it.
//! - Resolve configuration from process environment for CLI/service callers.
//!
//! # Invariants
//! - A `StoreConfig` always names exactly one store location.
//! - Busy timeout is never zero; zero input falls back to the default.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the database file path.
pub const ENV_DB_PATH: &str = "PANDA_DB_PATH";
/// Environment variable selecting a named in-memory store instead of a file.
pub const ENV_DB_MEMORY: &str = "PANDA_DB_MEMORY";
/// Environment variable overriding the busy timeout in milliseconds.
pub const ENV_DB_BUSY_TIMEOUT_MS: &str = "PANDA_DB_BUSY_TIMEOUT_MS";

pub const DEFAULT_DB_FILE_NAME: &str = "panda.sqlite3";
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the document store keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// SQLite database file on disk.
    File(PathBuf),
    /// Named shared in-memory database.
    ///
    /// Data lives as long as the root session that created it.
    Memory(String),
}

impl StoreLocation {
    /// Short label used in log events.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Memory(_) => "memory",
        }
    }
}

impl Display for StoreLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Memory(name) => write!(f, "memory:{name}"),
        }
    }
}

/// Connection settings for the document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub location: StoreLocation,
    pub busy_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::file(DEFAULT_DB_FILE_NAME)
    }
}

impl StoreConfig {
    /// Store backed by a database file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: StoreLocation::File(path.into()),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Store backed by a named in-memory database.
    pub fn memory(name: impl Into<String>) -> Self {
        Self {
            location: StoreLocation::Memory(name.into()),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Replaces the busy timeout; zero keeps the default.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = if timeout.is_zero() {
            DEFAULT_BUSY_TIMEOUT
        } else {
            timeout
        };
        self
    }

    /// Resolves configuration from process environment.
    ///
    /// `PANDA_DB_MEMORY` wins over `PANDA_DB_PATH`; with neither set the
    /// default file name in the working directory is used.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through an arbitrary key lookup.
    ///
    /// Split out from [`StoreConfig::from_env`] so callers and tests can feed
    /// values without touching process-global state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = match (non_empty(ENV_DB_MEMORY), non_empty(ENV_DB_PATH)) {
            (Some(name), _) => Self::memory(name),
            (None, Some(path)) => Self::file(path),
            (None, None) => Self::default(),
        };

        if let Some(raw) = non_empty(ENV_DB_BUSY_TIMEOUT_MS) {
            let millis = raw.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                key: ENV_DB_BUSY_TIMEOUT_MS,
                value: raw.clone(),
            })?;
            config = config.with_busy_timeout(Duration::from_millis(millis));
        }

        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for `{key}`")
            }
        }
    }
}

impl Error for ConfigError {}

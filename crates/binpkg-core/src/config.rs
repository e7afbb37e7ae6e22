//! Fetch policy configuration.
//!
//! Values are layered, later sources winning: built-in defaults, a TOML
//! file, then `BINPKG_*` environment variables. Command-line flags are
//! applied on top by the CLI.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding [`FetchConfig::retries`].
pub const ENV_RETRIES: &str = "BINPKG_RETRIES";
/// Environment variable overriding [`FetchConfig::timeout_seconds`].
pub const ENV_TIMEOUT_SECONDS: &str = "BINPKG_TIMEOUT_SECONDS";

/// Errors raised while assembling a [`FetchConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML, or has unrecognised keys.
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying parse error.
        source: toml::de::Error,
    },

    /// An environment override is not a non-negative integer.
    #[error("invalid value '{value}' for {key}: expected a non-negative integer")]
    InvalidEnv {
        /// Variable name.
        key: &'static str,
        /// Rejected value.
        value: String,
    },

    /// A setting holds a value the fetcher cannot work with.
    #[error("invalid {key}: {reason}")]
    InvalidValue {
        /// Setting name.
        key: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Retry and timeout policy for artifact downloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Extra attempts after the first one fails transiently.
    pub retries: u32,
    /// Upper bound on a single request, connect to last byte.
    pub timeout_seconds: u64,
    /// Delay before the first retry; doubles on each subsequent retry.
    pub backoff_ms: u64,
    /// Ceiling for the retry delay.
    pub max_backoff_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            timeout_seconds: 30,
            backoff_ms: 500,
            max_backoff_ms: 8_000,
        }
    }
}

impl FetchConfig {
    /// Parse a TOML config document. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns the TOML error for syntax errors and unknown keys.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not a valid config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path` if given, else the default config file if it exists,
    /// else the built-in defaults.
    ///
    /// # Errors
    ///
    /// Propagates [`FetchConfig::load`] errors. An explicit `path` that does
    /// not exist is an error; a missing default file is not.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match crate::paths::config_path() {
            Some(default) if default.is_file() => {
                tracing::debug!("Using config {}", default.display());
                Self::load(&default)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Apply `BINPKG_RETRIES` / `BINPKG_TIMEOUT_SECONDS` from `lookup`.
    ///
    /// `lookup` is usually `|k| std::env::var(k).ok()`; taking it as a
    /// parameter keeps tests away from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if a variable is set but is not
    /// a non-negative integer.
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(ENV_RETRIES) {
            self.retries = parse_env(ENV_RETRIES, &value)?;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_SECONDS) {
            self.timeout_seconds = parse_env(ENV_TIMEOUT_SECONDS, &value)?;
        }
        Ok(self)
    }

    /// Check the final, fully layered settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a zero `timeout_seconds`.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timeout_seconds",
                reason: "must be at least 1",
            });
        }
        Ok(self)
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Total number of attempts, the first one included.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based): exponential, capped.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry.saturating_sub(1));
        Duration::from_millis(
            self.backoff_ms
                .saturating_mul(factor)
                .min(self.max_backoff_ms),
        )
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key,
        value: value.to_string(),
    })
}

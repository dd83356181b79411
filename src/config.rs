//! Runtime configuration.
//!
//! Values are layered with the `config` crate, lowest precedence first:
//! built-in defaults, an optional config file, `FLAGSYNC_*` environment
//! variables, then explicit overrides (the CLI flags).

use crate::error::{Error, Result};
use crate::runtime::{EvaluatorProvider, ServiceProvider, SyncProvider};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix (`FLAGSYNC_URI`, `FLAGSYNC_PORT`, ...).
pub const ENV_PREFIX: &str = "FLAGSYNC";

/// Longest accepted remote polling cadence (one day).
pub const MAX_REMOTE_POLL_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Longest accepted remote request timeout.
pub const MAX_REMOTE_TIMEOUT_SECS: u64 = 10 * 60;

/// Longest accepted file polling cadence (one hour).
pub const MAX_FILE_POLL_INTERVAL_MS: u64 = 60 * 60 * 1000;

/// Longest accepted file notification debounce.
pub const MAX_FILE_DEBOUNCE_MS: u64 = 60 * 1000;

/// Immutable configuration handed to the runtime at construction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuntimeConfig {
    /// Sync provider key (`filepath` or `remote`).
    pub sync_provider: String,
    /// Evaluator key (`json`).
    pub evaluator: String,
    /// Service provider key (`http`).
    pub service_provider: String,
    /// File path or URL to sync flags from.
    pub uri: String,
    /// Bearer token for the remote provider.
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// HTTP service port.
    pub port: u16,
    /// Remote polling cadence, in seconds.
    pub remote_poll_interval_secs: u64,
    /// Remote request timeout, in seconds.
    pub remote_timeout_secs: u64,
    /// File polling cadence when OS notifications are unavailable, in milliseconds.
    pub file_poll_interval_ms: u64,
    /// Debounce for OS file notifications, in milliseconds.
    pub file_debounce_ms: u64,
}

/// Explicit values that win over every other layer.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Sync provider key.
    pub sync_provider: Option<String>,
    /// Evaluator key.
    pub evaluator: Option<String>,
    /// Service provider key.
    pub service_provider: Option<String>,
    /// Sync URI.
    pub uri: Option<String>,
    /// Remote bearer token.
    pub bearer_token: Option<String>,
    /// HTTP service port.
    pub port: Option<u16>,
}

impl RuntimeConfig {
    /// Load configuration from defaults, `config_file`, the environment and
    /// `overrides`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProviderNotFound`] for an unknown provider key, and
    /// [`Error::Config`] if a layer cannot be read, a value has the wrong
    /// type or is out of range, or no `uri` was given.
    pub fn load(config_file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        Self::load_with_prefix(ENV_PREFIX, config_file, overrides)
    }

    fn load_with_prefix(
        prefix: &str,
        config_file: Option<&Path>,
        overrides: &Overrides,
    ) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("sync_provider", "filepath")
            .and_then(|b| b.set_default("evaluator", "json"))
            .and_then(|b| b.set_default("service_provider", "http"))
            .and_then(|b| b.set_default("uri", ""))
            .and_then(|b| b.set_default("port", i64::from(crate::service::DEFAULT_PORT)))
            .and_then(|b| b.set_default("remote_poll_interval_secs", 300i64))
            .and_then(|b| b.set_default("remote_timeout_secs", 10i64))
            .and_then(|b| b.set_default("file_poll_interval_ms", 1000i64))
            .and_then(|b| b.set_default("file_debounce_ms", 200i64))
            .map_err(config_error)?;

        if let Some(path) = config_file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(config::Environment::with_prefix(prefix).try_parsing(true));

        let builder = builder
            .set_override_option("sync_provider", overrides.sync_provider.clone())
            .and_then(|b| b.set_override_option("evaluator", overrides.evaluator.clone()))
            .and_then(|b| {
                b.set_override_option("service_provider", overrides.service_provider.clone())
            })
            .and_then(|b| b.set_override_option("uri", overrides.uri.clone()))
            .and_then(|b| b.set_override_option("bearer_token", overrides.bearer_token.clone()))
            .and_then(|b| b.set_override_option("port", overrides.port.map(i64::from)))
            .map_err(config_error)?;

        let config: RuntimeConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(config_error)?;

        config.validate()?;
        Ok(config)
    }

    /// Check provider keys, then the values that cannot be defaulted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProviderNotFound`] for an unknown provider key and
    /// [`Error::Config`] for a missing `uri` or an out-of-range duration.
    pub fn validate(&self) -> Result<()> {
        self.sync_provider.parse::<SyncProvider>()?;
        self.evaluator.parse::<EvaluatorProvider>()?;
        self.service_provider.parse::<ServiceProvider>()?;

        if self.uri.trim().is_empty() {
            return Err(Error::Config("a sync uri is required".to_string()));
        }

        in_range(
            "remote_poll_interval_secs",
            self.remote_poll_interval_secs,
            MAX_REMOTE_POLL_INTERVAL_SECS,
        )?;
        in_range(
            "remote_timeout_secs",
            self.remote_timeout_secs,
            MAX_REMOTE_TIMEOUT_SECS,
        )?;
        in_range(
            "file_poll_interval_ms",
            self.file_poll_interval_ms,
            MAX_FILE_POLL_INTERVAL_MS,
        )?;
        if self.file_debounce_ms > MAX_FILE_DEBOUNCE_MS {
            return Err(Error::Config(format!(
                "file_debounce_ms must be at most {}",
                MAX_FILE_DEBOUNCE_MS
            )));
        }
        Ok(())
    }

    /// Remote polling cadence.
    pub fn remote_poll_interval(&self) -> Duration {
        Duration::from_secs(self.remote_poll_interval_secs)
    }

    /// Remote request timeout.
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }

    /// File polling cadence.
    pub fn file_poll_interval(&self) -> Duration {
        Duration::from_millis(self.file_poll_interval_ms)
    }

    /// File notification debounce.
    pub fn file_debounce(&self) -> Duration {
        Duration::from_millis(self.file_debounce_ms)
    }
}

fn in_range(key: &str, value: u64, max: u64) -> Result<()> {
    if value == 0 || value > max {
        return Err(Error::Config(format!(
            "{} must be between 1 and {}, got {}",
            key, max, value
        )));
    }
    Ok(())
}

fn config_error(e: config::ConfigError) -> Error {
    Error::Config(e.to_string())
}

//! Provider selection.
//!
//! Each provider kind is a closed enum parsed from its configuration key.
//! Adding a provider means adding a variant and its constructor arm; call
//! sites never change.

use crate::config::RuntimeConfig;
use crate::error::{Error, Result};
use crate::eval::{Evaluator, JsonEvaluator};
use crate::service::{HttpService, Service};
use crate::sources::{FilePathSync, SyncSource};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

#[cfg(feature = "remote")]
use crate::sources::HttpSync;

/// Registered sync providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncProvider {
    /// `filepath`: a local file.
    FilePath,
    /// `remote`: an HTTP(S) URL.
    #[cfg(feature = "remote")]
    Remote,
}

impl FromStr for SyncProvider {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "filepath" => Ok(Self::FilePath),
            #[cfg(feature = "remote")]
            "remote" => Ok(Self::Remote),
            other => Err(not_found("sync", other)),
        }
    }
}

impl SyncProvider {
    /// Construct the sync source described by `config`.
    pub fn build(self, config: &RuntimeConfig) -> Result<Arc<dyn SyncSource>> {
        match self {
            Self::FilePath => Ok(Arc::new(
                FilePathSync::new(&config.uri)
                    .with_debounce(config.file_debounce())
                    .with_poll_interval(config.file_poll_interval()),
            )),
            #[cfg(feature = "remote")]
            Self::Remote => {
                let mut builder = HttpSync::builder()
                    .with_url(&config.uri)
                    .with_timeout(config.remote_timeout())
                    .with_poll_interval(config.remote_poll_interval());
                if let Some(token) = &config.bearer_token {
                    builder = builder.with_bearer_token(token);
                }
                Ok(Arc::new(builder.build()?))
            }
        }
    }
}

/// Registered evaluators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluatorProvider {
    /// `json`: the JSON flag document evaluator.
    Json,
}

impl FromStr for EvaluatorProvider {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "json" => Ok(Self::Json),
            other => Err(not_found("evaluator", other)),
        }
    }
}

impl EvaluatorProvider {
    /// Construct an empty evaluator.
    pub fn build(self) -> Arc<dyn Evaluator> {
        match self {
            Self::Json => Arc::new(JsonEvaluator::new()),
        }
    }
}

/// Registered service providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceProvider {
    /// `http`: the axum HTTP service.
    Http,
}

impl FromStr for ServiceProvider {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "http" => Ok(Self::Http),
            other => Err(not_found("service", other)),
        }
    }
}

impl ServiceProvider {
    /// Construct the service described by `config`.
    pub fn build(self, config: &RuntimeConfig) -> Arc<dyn Service> {
        match self {
            Self::Http => Arc::new(HttpService::new(config.port)),
        }
    }
}

fn not_found(kind: &'static str, name: &str) -> Error {
    Error::ProviderNotFound {
        kind,
        name: name.to_string(),
    }
}

/// The three providers a runtime is composed of.
pub struct Providers {
    /// Where flags come from.
    pub sync: Arc<dyn SyncSource>,
    /// What answers queries.
    pub evaluator: Arc<dyn Evaluator>,
    /// How queries arrive.
    pub service: Arc<dyn Service>,
}

impl Providers {
    /// Resolve every provider key in `config`, then construct the providers.
    ///
    /// All three keys are checked before anything is constructed, and nothing
    /// here performs I/O.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProviderNotFound`] for an unknown key, or the
    /// construction error of the selected sync source.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self> {
        let sync: SyncProvider = config.sync_provider.parse()?;
        let evaluator: EvaluatorProvider = config.evaluator.parse()?;
        let service: ServiceProvider = config.service_provider.parse()?;

        debug!(provider = %config.sync_provider, "using sync provider");
        debug!(provider = %config.evaluator, "using evaluator");
        debug!(provider = %config.service_provider, "using service provider");

        Ok(Self {
            sync: sync.build(config)?,
            evaluator: evaluator.build(),
            service: service.build(config),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(sync: &str, evaluator: &str, service: &str) -> RuntimeConfig {
        RuntimeConfig {
            sync_provider: sync.to_string(),
            evaluator: evaluator.to_string(),
            service_provider: service.to_string(),
            uri: "http://localhost/flags.json".to_string(),
            bearer_token: Some("token".to_string()),
            port: 0,
            remote_poll_interval_secs: 300,
            remote_timeout_secs: 10,
            file_poll_interval_ms: 1000,
            file_debounce_ms: 200,
        }
    }

    #[test]
    fn test_parse_keys() {
        assert_eq!("filepath".parse::<SyncProvider>().unwrap(), SyncProvider::FilePath);
        #[cfg(feature = "remote")]
        assert_eq!("remote".parse::<SyncProvider>().unwrap(), SyncProvider::Remote);
        assert_eq!("json".parse::<EvaluatorProvider>().unwrap(), EvaluatorProvider::Json);
        assert_eq!("http".parse::<ServiceProvider>().unwrap(), ServiceProvider::Http);
    }

    #[test]
    fn test_unknown_keys() {
        let err = "s3".parse::<SyncProvider>().unwrap_err();
        assert!(matches!(err, Error::ProviderNotFound { kind: "sync", .. }));

        let err = "yaml".parse::<EvaluatorProvider>().unwrap_err();
        assert!(matches!(err, Error::ProviderNotFound { kind: "evaluator", .. }));

        let err = "grpc".parse::<ServiceProvider>().unwrap_err();
        assert!(matches!(err, Error::ProviderNotFound { kind: "service", .. }));
    }

    #[cfg(feature = "remote")]
    #[test]
    fn test_build_remote() {
        let providers = Providers::from_config(&config("remote", "json", "http")).unwrap();
        assert_eq!(providers.sync.name(), "http:http://localhost/flags.json");
        assert_eq!(providers.evaluator.flag_count(), 0);
        assert_eq!(providers.service.name(), "http:0");
    }

    #[test]
    fn test_build_filepath() {
        let mut cfg = config("filepath", "json", "http");
        cfg.uri = "/etc/flags.json".to_string();
        let providers = Providers::from_config(&cfg).unwrap();
        assert_eq!(providers.sync.name(), "file:/etc/flags.json");
    }

    #[test]
    fn test_unknown_service_fails_before_construction() {
        let result = Providers::from_config(&config("filepath", "json", "socket"));
        assert!(matches!(
            result,
            Err(Error::ProviderNotFound { kind: "service", .. })
        ));
    }
}

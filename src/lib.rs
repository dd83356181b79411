//! # flagsync
//!
//! Feature-flag sync daemon: fetch flag definitions from a pluggable source,
//! detect changes, reload an evaluator atomically and serve evaluations.
//!
//! ## Overview
//!
//! `flagsync` composes three providers:
//! - a **sync source** ([`sources::SyncSource`]) that fetches the flag document
//!   and watches it for changes, reporting [`notify::NotificationEvent`]s
//! - an **evaluator** ([`eval::Evaluator`]) holding the live flag set behind
//!   `arc-swap`, so reloads never tear a concurrent query
//! - a **service** ([`service::Service`]) answering queries over HTTP
//!
//! The [`runtime::Runtime`] loads the initial document, then re-fetches and
//! reloads on every change notification while the service runs, and shuts
//! everything down on cancellation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flagsync::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> flagsync::error::Result<()> {
//! let overrides = Overrides {
//!     uri: Some("config/flags.json".to_string()),
//!     ..Default::default()
//! };
//! let config = RuntimeConfig::load(None, &overrides)?;
//! let runtime = Runtime::from_config(&config)?;
//!
//! let cancel = CancellationToken::new();
//! let signal = cancel.clone();
//! tokio::spawn(async move {
//!     shutdown_signal().await;
//!     signal.cancel();
//! });
//!
//! runtime.run(cancel).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `file-watch` (default): OS change notifications for the filepath source;
//!   without it the source polls
//! - `remote` (default): the HTTP sync source

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod eval;
pub mod notify;
pub mod runtime;
pub mod service;
pub mod sources;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::config::{Overrides, RuntimeConfig};
    pub use crate::error::{Error, ResolveError, Result};
    pub use crate::eval::{Evaluator, JsonEvaluator};
    pub use crate::notify::NotificationEvent;
    pub use crate::runtime::{Runtime, RuntimeState, shutdown_signal};
    pub use crate::service::{HttpService, Service};
    pub use crate::sources::{FilePathSync, FlagPayload, SyncSource};

    #[cfg(feature = "remote")]
    pub use crate::sources::HttpSync;
}

//! The runtime: initial load, watch/reload loop, service loop, shutdown.

use super::Providers;
use crate::config::RuntimeConfig;
use crate::error::{Error, Result};
use crate::eval::Evaluator;
use crate::notify::NotificationEvent;
use crate::service::Service;
use crate::sources::SyncSource;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Capacity of the notification channel between the watch loop and the
/// reload consumer.
const EVENT_BUFFER: usize = 16;

/// Lifecycle of a [`Runtime`].
///
/// `Initializing -> Loaded -> Running -> ShuttingDown -> Terminated`; a
/// failure while initializing goes straight to `Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    /// Fetching and loading the initial configuration.
    Initializing,
    /// Initial configuration loaded, loops not started yet.
    Loaded,
    /// Watching for changes and serving.
    Running,
    /// Cancellation observed, loops draining.
    ShuttingDown,
    /// All loops have returned.
    Terminated,
}

impl fmt::Display for RuntimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initializing => "initializing",
            Self::Loaded => "loaded",
            Self::Running => "running",
            Self::ShuttingDown => "shutting-down",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Composes one sync source, one evaluator and one service.
///
/// [`run`](Runtime::run) loads the initial configuration, then runs the sync
/// source's watch loop, a consumer that re-fetches and reloads on every
/// notification, and the service, until the token is cancelled or the
/// service fails.
///
/// # Examples
///
/// ```rust,no_run
/// use flagsync::config::{Overrides, RuntimeConfig};
/// use flagsync::runtime::Runtime;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> flagsync::error::Result<()> {
/// let overrides = Overrides {
///     uri: Some("flags.json".to_string()),
///     ..Default::default()
/// };
/// let config = RuntimeConfig::load(None, &overrides)?;
/// let runtime = Runtime::from_config(&config)?;
///
/// let cancel = CancellationToken::new();
/// runtime.run(cancel).await?;
/// # Ok(())
/// # }
/// ```
pub struct Runtime {
    sync: Arc<dyn SyncSource>,
    evaluator: Arc<dyn Evaluator>,
    service: Arc<dyn Service>,
    state: watch::Sender<RuntimeState>,
}

impl Runtime {
    /// Compose a runtime from already constructed providers.
    pub fn new(providers: Providers) -> Self {
        let (state, _) = watch::channel(RuntimeState::Initializing);
        Self {
            sync: providers.sync,
            evaluator: providers.evaluator,
            service: providers.service,
            state,
        }
    }

    /// Select and construct providers from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProviderNotFound`] for an unknown provider key.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self> {
        Ok(Self::new(Providers::from_config(config)?))
    }

    /// The evaluator shared with the service.
    pub fn evaluator(&self) -> Arc<dyn Evaluator> {
        Arc::clone(&self.evaluator)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RuntimeState {
        *self.state.borrow()
    }

    /// Follow lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<RuntimeState> {
        self.state.subscribe()
    }

    /// Run until `cancel` fires or a component fails fatally.
    ///
    /// Returns `Ok(())` after a cancellation-initiated shutdown.
    ///
    /// # Errors
    ///
    /// - [`Error::SourceUnreachable`] if the initial fetch fails
    /// - [`Error::Parse`] if the initial payload cannot be loaded
    /// - [`Error::ServiceFailure`] if the service stops on its own
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let result = self.run_session(cancel).await;
        if let Err(e) = &result {
            error!(error = %e, "runtime stopped");
        }
        self.transition(RuntimeState::Terminated);
        result
    }

    async fn run_session(&self, cancel: CancellationToken) -> Result<()> {
        self.transition(RuntimeState::Initializing);

        let payload = self.sync.fetch().await?;
        self.evaluator.load(&payload)?;
        info!(
            source = %self.sync.name(),
            flags = self.evaluator.flag_count(),
            "initial flag configuration loaded"
        );
        self.transition(RuntimeState::Loaded);

        let session = cancel.child_token();
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let watch_handle = Arc::clone(&self.sync).watch(events_tx, session.clone());
        self.transition(RuntimeState::Running);
        info!(service = %self.service.name(), "serving flags");

        let shutdown = async {
            session.cancelled().await;
            self.transition(RuntimeState::ShuttingDown);
        };

        let serve = async {
            let mut result = self
                .service
                .serve(Arc::clone(&self.evaluator), session.clone())
                .await;
            if result.is_ok() && !session.is_cancelled() {
                result = Err(Error::ServiceFailure(format!(
                    "{} stopped before shutdown was requested",
                    self.service.name()
                )));
            }
            session.cancel();
            result
        };

        let ((), served, ()) = tokio::join!(shutdown, serve, self.consume(events_rx, &session));

        if let Err(e) = watch_handle.await {
            warn!(error = %e, "watch task ended abnormally");
        }

        served
    }

    /// Reload on every notification until cancelled.
    async fn consume(
        &self,
        mut events: mpsc::Receiver<NotificationEvent>,
        cancel: &CancellationToken,
    ) {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => event,
            };

            let Some(event) = event else {
                warn!("watch loop ended, serving last loaded flags until shutdown");
                cancel.cancelled().await;
                break;
            };

            self.reload(event, cancel).await;
        }
    }

    /// Re-fetch and load; the event only says that something changed.
    async fn reload(&self, event: NotificationEvent, cancel: &CancellationToken) {
        let fetched = tokio::select! {
            _ = cancel.cancelled() => return,
            fetched = self.sync.fetch() => fetched,
        };

        let payload = match fetched {
            Ok(payload) => payload,
            Err(e) => {
                warn!(%event, error = %e, "re-fetch failed, keeping current flags");
                return;
            }
        };

        match self.evaluator.load(&payload) {
            Ok(()) => info!(
                %event,
                flags = self.evaluator.flag_count(),
                "flag configuration reloaded"
            ),
            Err(e) => warn!(%event, error = %e, "reload rejected, keeping previous flags"),
        }
    }

    fn transition(&self, next: RuntimeState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            info!(from = %previous, to = %next, "runtime state changed");
        }
    }
}

//! Sync source trait and the flag payload it produces.

use crate::error::Result;
use crate::notify::NotificationEvent;
use crate::sources::ChangeDetector;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// The full flag-definition document as fetched from a source.
///
/// Opaque to the sync layer: only emptiness and the fingerprint are looked at.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct FlagPayload(Vec<u8>);

impl FlagPayload {
    /// Wrap raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw bytes of the document.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether the source produced no content at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<Vec<u8>> for FlagPayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&str> for FlagPayload {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for FlagPayload {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl fmt::Debug for FlagPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagPayload").field("len", &self.0.len()).finish()
    }
}

/// A source of flag definitions.
///
/// Implement this trait to add a new place flags can be synced from (object
/// storage, a streaming RPC, ...). Implementations must provide a one-shot
/// [`fetch`](SyncSource::fetch) and a background [`watch`](SyncSource::watch)
/// loop that reports changes.
#[async_trait::async_trait]
pub trait SyncSource: Send + Sync + 'static {
    /// Read the current payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceUnreachable`](crate::error::Error::SourceUnreachable)
    /// when the underlying I/O fails. A partially read payload is never
    /// returned as success.
    async fn fetch(&self) -> Result<FlagPayload>;

    /// Spawn the change-detection loop and return immediately.
    ///
    /// The loop owns its own [`ChangeDetector`], sends one event per detected
    /// change in detection order, and exits when `cancel` fires or the
    /// receiver is dropped. Fetch failures inside the loop are logged and
    /// never reported as events.
    fn watch(
        self: Arc<Self>,
        events: mpsc::Sender<NotificationEvent>,
        cancel: CancellationToken,
    ) -> JoinHandle<()>;

    /// Get a human-readable name for this source (for logging/debugging).
    fn name(&self) -> String;
}

/// Feed an observation to the detector and forward any resulting event.
///
/// Returns `false` when the loop should stop (receiver gone or cancelled).
pub(crate) async fn publish(
    detector: &mut ChangeDetector,
    payload: &FlagPayload,
    events: &mpsc::Sender<NotificationEvent>,
    cancel: &CancellationToken,
    source: &str,
) -> bool {
    let Some(event) = detector.observe(payload) else {
        return true;
    };
    info!(source, %event, "flag source changed");
    tokio::select! {
        sent = events.send(event) => sent.is_ok(),
        _ = cancel.cancelled() => false,
    }
}

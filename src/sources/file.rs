//! Local file sync source.

use super::{ChangeDetector, FlagPayload, SyncSource, publish};
use crate::config::{MAX_FILE_DEBOUNCE_MS, MAX_FILE_POLL_INTERVAL_MS};
use crate::error::{Error, Result};
use crate::notify::NotificationEvent;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[cfg(feature = "file-watch")]
use crate::notify::FileWatcher;

/// Default debounce applied to OS change notifications.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Default polling cadence when OS notifications are unavailable.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Safety re-read cadence while OS notifications are active.
#[cfg(feature = "file-watch")]
const RESCAN_INTERVAL: Duration = Duration::from_secs(60);

/// File-based sync source.
///
/// Reads the flag document from a local path. The watch loop reacts to OS
/// change notifications (with the `file-watch` feature) and falls back to
/// polling when they are unavailable. A file that disappears is reported as a
/// deletion.
///
/// # Examples
///
/// ```rust,no_run
/// use flagsync::sources::FilePathSync;
/// use std::time::Duration;
///
/// let source = FilePathSync::new("config/flags.json")
///     .with_poll_interval(Duration::from_millis(500));
/// ```
pub struct FilePathSync {
    path: PathBuf,
    debounce: Duration,
    poll_interval: Duration,
}

impl FilePathSync {
    /// Create a new file source.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            debounce: DEFAULT_DEBOUNCE,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the debounce applied to bursts of OS notifications.
    ///
    /// Capped at one minute.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce.min(Duration::from_millis(MAX_FILE_DEBOUNCE_MS));
        self
    }

    /// Set the polling cadence used when OS notifications are unavailable.
    ///
    /// Clamped to between one millisecond and one hour.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.clamp(
            Duration::from_millis(1),
            Duration::from_millis(MAX_FILE_POLL_INTERVAL_MS),
        );
        self
    }

    /// The file this source reads.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read for the watch loop: a missing file is an empty payload.
    async fn observe(&self) -> Result<FlagPayload> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(FlagPayload::new(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(FlagPayload::default()),
            Err(e) => Err(Error::unreachable(self.name(), e)),
        }
    }
}

#[async_trait::async_trait]
impl SyncSource for FilePathSync {
    async fn fetch(&self) -> Result<FlagPayload> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| Error::unreachable(self.name(), e))?;
        Ok(FlagPayload::new(bytes))
    }

    fn watch(
        self: Arc<Self>,
        events: mpsc::Sender<NotificationEvent>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let name = self.name();
            let mut detector = ChangeDetector::new();
            let mut trigger = ChangeTrigger::new(&self.path, self.debounce, self.poll_interval);

            // Baseline, so the detector starts from the current content.
            match self.observe().await {
                Ok(payload) => {
                    if !publish(&mut detector, &payload, &events, &cancel, &name).await {
                        return;
                    }
                }
                Err(e) => warn!(source = %name, error = %e, "initial read failed"),
            }

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = trigger.wait() => {}
                }

                match self.observe().await {
                    Ok(payload) => {
                        if !publish(&mut detector, &payload, &events, &cancel, &name).await {
                            break;
                        }
                    }
                    Err(e) => warn!(source = %name, error = %e, "read failed, retrying"),
                }
            }

            debug!(source = %name, "watch loop stopped");
        })
    }

    fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// Wakes the file watch loop: OS notifications plus a slow rescan, or plain
/// polling when notifications are unavailable.
struct ChangeTrigger {
    #[cfg(feature = "file-watch")]
    watcher: Option<FileWatcher>,
    ticker: Interval,
    #[cfg_attr(not(feature = "file-watch"), allow(dead_code))]
    poll_interval: Duration,
}

impl ChangeTrigger {
    #[cfg(feature = "file-watch")]
    fn new(path: &Path, debounce: Duration, poll_interval: Duration) -> Self {
        match FileWatcher::new(path, debounce) {
            Ok(watcher) => Self {
                watcher: Some(watcher),
                ticker: ticker(RESCAN_INTERVAL),
                poll_interval,
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "file notifications unavailable, polling");
                Self {
                    watcher: None,
                    ticker: ticker(poll_interval),
                    poll_interval,
                }
            }
        }
    }

    #[cfg(not(feature = "file-watch"))]
    fn new(_path: &Path, _debounce: Duration, poll_interval: Duration) -> Self {
        Self {
            ticker: ticker(poll_interval),
            poll_interval,
        }
    }

    async fn wait(&mut self) {
        #[cfg(feature = "file-watch")]
        if let Some(watcher) = self.watcher.as_mut() {
            let stopped = tokio::select! {
                changed = watcher.changed() => changed.is_none(),
                _ = self.ticker.tick() => false,
            };
            if stopped {
                warn!("file watcher stopped, falling back to polling");
                self.watcher = None;
                self.ticker = ticker(self.poll_interval);
            }
            return;
        }

        self.ticker.tick().await;
    }
}

fn ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

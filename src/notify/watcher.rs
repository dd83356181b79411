//! File watching for the filepath sync source.

use crate::error::{Error, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Watches a single flag file for changes.
///
/// Uses the `notify` crate on the file's parent directory rather than the file
/// itself, so editors that save by rename and files that are removed and
/// re-created keep producing events. Bursts of events are debounced into a
/// single change signal.
///
/// # Examples
///
/// ```rust,no_run
/// use flagsync::notify::FileWatcher;
/// use std::time::Duration;
///
/// # async fn example() -> flagsync::error::Result<()> {
/// let mut watcher = FileWatcher::new("/etc/flags/flags.json", Duration::from_millis(200))?;
///
/// while watcher.changed().await.is_some() {
///     println!("flag file touched");
/// }
/// # Ok(())
/// # }
/// ```
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    events: mpsc::UnboundedReceiver<()>,
    debounce_duration: Duration,
    path: PathBuf,
}

impl FileWatcher {
    /// Start watching `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Watch`] if the parent directory cannot be resolved or
    /// the OS watcher cannot be created.
    pub fn new(path: impl AsRef<Path>, debounce_duration: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file_name: OsString = path
            .file_name()
            .ok_or_else(|| Error::Watch(format!("not a file path: {}", path.display())))?
            .to_os_string();

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let parent = parent
            .canonicalize()
            .map_err(|e| Error::Watch(format!("failed to resolve {}: {}", parent.display(), e)))?;

        let (tx, events) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else {
                return;
            };
            let relevant = matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            );
            let ours = event
                .paths
                .iter()
                .any(|p| p.file_name() == Some(file_name.as_os_str()));
            if relevant && ours {
                let _ = tx.send(());
            }
        })
        .map_err(|e| Error::Watch(format!("failed to create file watcher: {}", e)))?;

        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .map_err(|e| Error::Watch(format!("failed to watch {}: {}", parent.display(), e)))?;

        Ok(Self {
            _watcher: watcher,
            events,
            debounce_duration,
            path,
        })
    }

    /// Wait for the next debounced change.
    ///
    /// Returns `None` once the underlying watcher has shut down.
    pub async fn changed(&mut self) -> Option<()> {
        self.events.recv().await?;
        // Swallow the rest of the burst.
        loop {
            match timeout(self.debounce_duration, self.events.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) | Err(_) => return Some(()),
            }
        }
    }

    /// The watched file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the debounce duration for this watcher.
    pub fn debounce_duration(&self) -> Duration {
        self.debounce_duration
    }
}

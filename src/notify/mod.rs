//! Change notification: the event vocabulary exchanged between a sync source
//! and its consumer, and the filesystem watcher backing the filepath source.

pub mod event;
#[cfg(feature = "file-watch")]
pub mod watcher;

pub use event::NotificationEvent;
#[cfg(feature = "file-watch")]
pub use watcher::FileWatcher;

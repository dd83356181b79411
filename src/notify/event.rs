//! Notification events emitted by sync sources.

use std::fmt;

/// Signal that a sync source's content changed.
///
/// Events say *that* the flag document changed and *how* (appeared, changed,
/// disappeared), never *what* changed. A consumer must treat every event as
/// "invalidate and re-fetch"; there is nothing to apply as a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationEvent {
    /// The source produced content for the first time, or reappeared after a
    /// deletion with its last known content.
    Create,
    /// The source's content differs from the last observed content.
    Modify,
    /// The source is gone or empty.
    Delete,
}

impl NotificationEvent {
    /// Lowercase name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Modify => "modify",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Payload fingerprinting and change detection.

use crate::notify::NotificationEvent;
use crate::sources::FlagPayload;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 digest of a [`FlagPayload`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprint a payload.
    pub fn of(payload: &FlagPayload) -> Self {
        Self(Sha256::digest(payload.as_bytes()).into())
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&URL_SAFE.encode(self.0))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self)
    }
}

/// Turns successive payload observations into [`NotificationEvent`]s.
///
/// Holds the fingerprint of the last non-empty payload. An empty payload
/// reports a deletion but leaves that fingerprint in place, so reappearance is
/// judged against the last known-good content:
///
/// | observation                         | event    |
/// |-------------------------------------|----------|
/// | non-empty, nothing stored           | `Create` |
/// | empty (source was present)          | `Delete` |
/// | empty (already deleted)             | none     |
/// | non-empty after delete, same digest | `Create` |
/// | non-empty, different digest         | `Modify` |
/// | non-empty, same digest              | none     |
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last: Option<Fingerprint>,
    deleted: bool,
}

impl ChangeDetector {
    /// A detector that has seen nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation and return the event it implies, if any.
    pub fn observe(&mut self, payload: &FlagPayload) -> Option<NotificationEvent> {
        if payload.is_empty() {
            if self.deleted {
                return None;
            }
            self.deleted = true;
            return Some(NotificationEvent::Delete);
        }

        let current = Fingerprint::of(payload);
        let event = match self.last {
            None => Some(NotificationEvent::Create),
            Some(previous) if previous != current => Some(NotificationEvent::Modify),
            Some(_) if self.deleted => Some(NotificationEvent::Create),
            Some(_) => None,
        };
        self.last = Some(current);
        self.deleted = false;
        event
    }

    /// Fingerprint of the last non-empty payload observed.
    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.last.as_ref()
    }
}

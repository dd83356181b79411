//! Sync source implementations.

mod detector;
mod file;
#[cfg(feature = "remote")]
mod remote;
mod sync_source;

pub use detector::{ChangeDetector, Fingerprint};
pub use file::FilePathSync;
#[cfg(feature = "remote")]
pub use remote::{HttpSync, HttpSyncBuilder};
pub use sync_source::{FlagPayload, SyncSource};

pub(crate) use sync_source::publish;

//! Runtime orchestration: provider selection, the reload loop and shutdown.

mod orchestrator;
pub mod registry;
mod signal;

pub use orchestrator::{Runtime, RuntimeState};
pub use registry::{EvaluatorProvider, Providers, ServiceProvider, SyncProvider};
pub use signal::shutdown_signal;

//! Transports that serve flag evaluations.

mod http;

pub use http::{DEFAULT_PORT, HttpService};

use crate::error::Result;
use crate::eval::Evaluator;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Serves evaluation queries over some transport.
///
/// [`serve`](Service::serve) runs for the lifetime of the transport: it
/// returns `Ok(())` once `cancel` fires and the transport has drained, or
/// [`Error::ServiceFailure`](crate::error::Error::ServiceFailure) if the
/// transport dies on its own.
#[async_trait::async_trait]
pub trait Service: Send + Sync {
    /// Serve queries against `evaluator` until cancelled.
    async fn serve(&self, evaluator: Arc<dyn Evaluator>, cancel: CancellationToken) -> Result<()>;

    /// Get a human-readable name for this service (for logging/debugging).
    fn name(&self) -> String;
}

//! Remote HTTP/HTTPS sync source.

use super::{ChangeDetector, FlagPayload, SyncSource, publish};
use crate::config::MAX_REMOTE_POLL_INTERVAL_SECS;
use crate::error::{Error, Result};
use crate::notify::NotificationEvent;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default polling cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// HTTP-based sync source.
///
/// Fetches the flag document with a `GET` to a fixed URL and polls it on a
/// fixed schedule to detect changes. The response body is passed through
/// byte-for-byte.
///
/// # Examples
///
/// ```rust,no_run
/// use flagsync::sources::HttpSync;
/// use std::time::Duration;
///
/// # fn example() -> flagsync::error::Result<()> {
/// let source = HttpSync::builder()
///     .with_url("https://flags.example.com/flags.json")
///     .with_bearer_token("secret-token")
///     .with_poll_interval(Duration::from_secs(60))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct HttpSync {
    url: String,
    client: Client,
    bearer_token: Option<String>,
    poll_interval: Duration,
}

impl HttpSync {
    /// Create a new builder for constructing an HTTP source.
    pub fn builder() -> HttpSyncBuilder {
        HttpSyncBuilder::new()
    }

    /// The polling cadence of the watch loop.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

#[async_trait::async_trait]
impl SyncSource for HttpSync {
    async fn fetch(&self) -> Result<FlagPayload> {
        let mut request = self
            .client
            .get(&self.url)
            .header(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = &self.bearer_token {
            let header_value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| Error::Config(format!("Invalid bearer token: {}", e)))?;
            request = request.header(AUTHORIZATION, header_value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::unreachable(self.name(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::unreachable(
                self.name(),
                format!(
                    "status {}: {}",
                    status,
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::unreachable(self.name(), e))?;

        Ok(FlagPayload::new(body.to_vec()))
    }

    fn watch(
        self: Arc<Self>,
        events: mpsc::Sender<NotificationEvent>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let name = self.name();
            let mut detector = ChangeDetector::new();
            let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let fetched = tokio::select! {
                    _ = cancel.cancelled() => break,
                    fetched = self.fetch() => fetched,
                };

                match fetched {
                    Ok(payload) => {
                        if !publish(&mut detector, &payload, &events, &cancel, &name).await {
                            break;
                        }
                    }
                    Err(e) => warn!(source = %name, error = %e, "poll failed, retrying next tick"),
                }
            }

            debug!(source = %name, "watch loop stopped");
        })
    }

    fn name(&self) -> String {
        format!("http:{}", self.url)
    }
}

/// Builder for constructing an `HttpSync`.
pub struct HttpSyncBuilder {
    url: Option<String>,
    bearer_token: Option<String>,
    timeout: Duration,
    poll_interval: Duration,
}

impl HttpSyncBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            url: None,
            bearer_token: None,
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the URL to fetch flags from.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set Bearer token authentication.
    ///
    /// An empty token means no `Authorization` header is sent.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.bearer_token = (!token.is_empty()).then_some(token);
        self
    }

    /// Set the request timeout.
    ///
    /// Default is 10 seconds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the polling cadence of the watch loop.
    ///
    /// Default is 5 minutes.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Build the HTTP source.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No URL (or an empty one) is provided
    /// - The poll interval is zero or longer than a day
    /// - The request timeout is zero
    /// - The HTTP client cannot be constructed
    pub fn build(self) -> Result<HttpSync> {
        let url = self
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::Config("no HTTP URL set for remote sync".to_string()))?;

        let max_poll = Duration::from_secs(MAX_REMOTE_POLL_INTERVAL_SECS);
        if self.poll_interval.is_zero() || self.poll_interval > max_poll {
            return Err(Error::Config(format!(
                "poll interval must be non-zero and at most {:?}",
                max_poll
            )));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("request timeout must be non-zero".to_string()));
        }

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(HttpSync {
            url,
            client,
            bearer_token: self.bearer_token,
            poll_interval: self.poll_interval,
        })
    }
}

impl Default for HttpSyncBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let source = HttpSync::builder()
            .with_url("https://example.com/flags.json")
            .with_bearer_token("token123")
            .with_timeout(Duration::from_secs(5))
            .with_poll_interval(Duration::from_secs(30))
            .build();
        assert!(source.is_ok());

        let source = source.unwrap();
        assert_eq!(source.url, "https://example.com/flags.json");
        assert_eq!(source.bearer_token.as_deref(), Some("token123"));
        assert_eq!(source.poll_interval(), Duration::from_secs(30));
        assert_eq!(source.name(), "http:https://example.com/flags.json");
    }

    #[test]
    fn test_builder_defaults() {
        let source = HttpSync::builder()
            .with_url("https://example.com/flags.json")
            .build()
            .unwrap();
        assert_eq!(source.poll_interval(), DEFAULT_POLL_INTERVAL);
        assert!(source.bearer_token.is_none());
    }

    #[test]
    fn test_builder_no_url() {
        assert!(matches!(HttpSync::builder().build(), Err(Error::Config(_))));
        assert!(matches!(
            HttpSync::builder().with_url("").build(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_empty_bearer_token_is_ignored() {
        let source = HttpSync::builder()
            .with_url("https://example.com/flags.json")
            .with_bearer_token("")
            .build()
            .unwrap();
        assert!(source.bearer_token.is_none());
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let result = HttpSync::builder()
            .with_url("https://example.com/flags.json")
            .with_poll_interval(Duration::ZERO)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_out_of_range_durations_rejected() {
        let result = HttpSync::builder()
            .with_url("https://example.com/flags.json")
            .with_poll_interval(Duration::from_secs(u64::MAX))
            .build();
        assert!(matches!(result, Err(Error::Config(_))));

        let result = HttpSync::builder()
            .with_url("https://example.com/flags.json")
            .with_timeout(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_fetch_unreachable() {
        let source = HttpSync::builder()
            .with_url("http://127.0.0.1:9/flags.json")
            .with_timeout(Duration::from_secs(1))
            .build()
            .unwrap();

        let result = source.fetch().await;
        assert!(matches!(result, Err(Error::SourceUnreachable { .. })));
    }
}

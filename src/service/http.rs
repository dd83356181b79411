//! HTTP evaluation service.

use super::Service;
use crate::error::{Error, ResolveError, Result};
use crate::eval::{Evaluator, Resolution, ValueKind};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8080;

type SharedEvaluator = Arc<dyn Evaluator>;

/// Serves evaluations over HTTP.
///
/// Routes:
/// - `GET /health`
/// - `GET /flags` resolves every enabled flag from one snapshot
/// - `POST /flags/{key}/resolve/{boolean|string|number|object}`
pub struct HttpService {
    port: u16,
}

impl HttpService {
    /// Create a service listening on `0.0.0.0:<port>`.
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    /// The configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Build the router for `evaluator`.
    pub fn router(evaluator: SharedEvaluator) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/flags", get(resolve_all))
            .route("/flags/{key}/resolve/{kind}", post(resolve))
            .layer(TraceLayer::new_for_http())
            .with_state(evaluator)
    }

    /// Serve on an already bound listener until `cancel` fires.
    pub async fn serve_on(
        listener: TcpListener,
        evaluator: SharedEvaluator,
        cancel: CancellationToken,
    ) -> Result<()> {
        if let Ok(addr) = listener.local_addr() {
            info!(%addr, "http service listening");
        }

        axum::serve(listener, Self::router(evaluator))
            .with_graceful_shutdown(cancel.cancelled_owned())
            .await
            .map_err(|e| Error::ServiceFailure(format!("http server error: {}", e)))
    }
}

impl Default for HttpService {
    fn default() -> Self {
        Self::new(DEFAULT_PORT)
    }
}

#[async_trait::async_trait]
impl Service for HttpService {
    async fn serve(&self, evaluator: SharedEvaluator, cancel: CancellationToken) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::ServiceFailure(format!("failed to bind {}: {}", addr, e)))?;
        Self::serve_on(listener, evaluator, cancel).await
    }

    fn name(&self) -> String {
        format!("http:{}", self.port)
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Serialize)]
struct AllFlagsResponse {
    flags: BTreeMap<String, Resolution>,
}

async fn resolve_all(State(evaluator): State<SharedEvaluator>) -> Json<AllFlagsResponse> {
    Json(AllFlagsResponse {
        flags: evaluator.resolve_all().into_iter().collect(),
    })
}

async fn resolve(
    State(evaluator): State<SharedEvaluator>,
    Path((key, kind)): Path<(String, String)>,
) -> Response {
    let kind = match kind.as_str() {
        "boolean" => ValueKind::Boolean,
        "string" => ValueKind::String,
        "number" => ValueKind::Number,
        "object" => ValueKind::Object,
        other => {
            return ErrorBody::response(
                StatusCode::NOT_FOUND,
                "UNKNOWN_KIND",
                format!("unknown value kind '{}'", other),
            );
        }
    };

    match evaluator.resolve_kind(&key, kind) {
        Ok(resolution) => Json(resolution).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error_code: &'static str,
    message: String,
}

impl ErrorBody {
    fn response(status: StatusCode, error_code: &'static str, message: String) -> Response {
        (status, Json(ErrorBody { error_code, message })).into_response()
    }
}

impl IntoResponse for ResolveError {
    fn into_response(self) -> Response {
        let status = match self {
            ResolveError::FlagNotFound(_) => StatusCode::NOT_FOUND,
            ResolveError::FlagDisabled(_) | ResolveError::TypeMismatch { .. } => {
                StatusCode::BAD_REQUEST
            }
        };
        ErrorBody::response(status, self.code(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::JsonEvaluator;
    use crate::sources::FlagPayload;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use std::time::Duration;
    use tower::ServiceExt;

    fn evaluator() -> SharedEvaluator {
        let evaluator = JsonEvaluator::new();
        evaluator
            .load(&FlagPayload::from(
                r#"{"flags":{
                    "beta":{"variants":{"on":true,"off":false},"defaultVariant":"on"},
                    "color":{"variants":{"blue":"blue"},"defaultVariant":"blue"},
                    "old":{"state":"DISABLED","variants":{"on":true},"defaultVariant":"on"}
                }}"#,
            ))
            .unwrap();
        Arc::new(evaluator)
    }

    async fn call(method: &str, uri: &str) -> (StatusCode, Value) {
        let response = HttpService::router(evaluator())
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call("GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_resolve_boolean() {
        let (status, body) = call("POST", "/flags/beta/resolve/boolean").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"value": true, "variant": "on", "reason": "STATIC"}));
    }

    #[tokio::test]
    async fn test_resolve_missing_flag() {
        let (status, body) = call("POST", "/flags/nope/resolve/boolean").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errorCode"], "FLAG_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_resolve_type_mismatch() {
        let (status, body) = call("POST", "/flags/color/resolve/number").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorCode"], "TYPE_MISMATCH");
    }

    #[tokio::test]
    async fn test_resolve_disabled() {
        let (status, body) = call("POST", "/flags/old/resolve/boolean").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorCode"], "FLAG_DISABLED");
    }

    #[tokio::test]
    async fn test_unknown_kind() {
        let (status, body) = call("POST", "/flags/beta/resolve/date").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errorCode"], "UNKNOWN_KIND");
    }

    #[tokio::test]
    async fn test_resolve_all() {
        let (status, body) = call("GET", "/flags").await;
        assert_eq!(status, StatusCode::OK);
        let flags = body["flags"].as_object().unwrap();
        assert_eq!(flags.len(), 2);
        assert_eq!(flags["color"]["value"], "blue");
    }

    #[tokio::test]
    async fn test_serve_stops_on_cancel() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(HttpService::serve_on(listener, evaluator(), cancel.clone()));

        cancel.cancel();
        let result = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_bind_failure_is_service_failure() {
        let taken = TcpListener::bind("0.0.0.0:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let result = HttpService::new(port)
            .serve(evaluator(), CancellationToken::new())
            .await;
        assert!(matches!(result, Err(Error::ServiceFailure(_))));
    }
}

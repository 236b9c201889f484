//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the string service handlers
//! - Wire up middleware (request ID, tracing, timeout)
//! - Bind server to listener and stop on shutdown
//! - Tie each call's cancellation to the inbound request

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{HeaderName, Request},
    routing::{get, post},
    Json, Router,
};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::endpoint::CallContext;
use crate::http::request::{request_id, MakeRequestUuidV4, X_REQUEST_ID};
use crate::http::response::ApiError;
use crate::service::{HelloResponse, ReverseRequest, ReverseResponse, SharedStringService};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: SharedStringService,
}

/// HTTP edge of the string service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &ProxyConfig, service: SharedStringService) -> Self {
        let state = AppState { service };
        let router = Self::build_router(config, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let x_request_id = HeaderName::from_static(X_REQUEST_ID);

        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuidV4))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id(request.headers()),
                )
            }))
            .layer(PropagateRequestIdLayer::new(x_request_id))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        Router::new()
            .route("/strings/reversions", post(reverse_handler))
            .route("/strings/greetings", get(hello_handler))
            .with_state(state)
            .layer(middleware)
    }

    /// The fully layered router, for serving or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn reverse_handler(
    State(state): State<AppState>,
    payload: Result<Json<ReverseRequest>, JsonRejection>,
) -> Result<Json<ReverseResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    Ok(Json(ReverseResponse {
        result: state.service.reverse(&request.value),
    }))
}

/// Dropping this future (client gone, edge timeout) cancels the remote call.
async fn hello_handler(State(state): State<AppState>) -> Result<Json<HelloResponse>, ApiError> {
    let ctx = CallContext::new();
    let _cancel = ctx.cancel_on_drop();

    let result = state.service.hello(&ctx).await?;
    Ok(Json(HelloResponse { result }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{CallError, CallResult};
    use crate::service::{LocalStringService, StringService};
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct Exhausted;

    #[async_trait]
    impl StringService for Exhausted {
        fn reverse(&self, value: &str) -> String {
            value.to_string()
        }

        async fn hello(&self, _ctx: &CallContext) -> CallResult<String> {
            Err(CallError::RetriesExhausted {
                attempts: 2,
                last: Box::new(CallError::downstream("http://a:1", "503")),
            })
        }
    }

    fn router(service: SharedStringService) -> Router {
        HttpServer::new(&ProxyConfig::default(), service).router()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_reverse_route() {
        let app = router(Arc::new(LocalStringService::new("n")));
        let request = Request::post("/strings/reversions")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"value":"hello"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(X_REQUEST_ID));
        assert_eq!(body_json(response).await["result"], "olleh");
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let app = router(Arc::new(LocalStringService::new("n")));
        let request = Request::post("/strings/reversions")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_exhaustion_maps_to_429() {
        let app = router(Arc::new(Exhausted));
        let request = Request::get("/strings/greetings")
            .header(X_REQUEST_ID, "req-42")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[X_REQUEST_ID], "req-42");
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("after 2 attempt"));
    }
}

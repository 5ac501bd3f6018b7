//! HTTP server setup and the proxy handler.
//!
//! # Responsibilities
//! - Create the Axum router: health endpoint plus the mount prefix catch-all
//! - Wire up middleware (request ID, tracing)
//! - Run the per-request pipeline: resolve → forward → transport → relay
//! - Serve until shutdown is signalled

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use url::Url;

use crate::config::{ProxyConfig, ValidationError};
use crate::http::client::{HttpTransport, Transport};
use crate::http::error::{body_too_large, ProxyError};
use crate::http::forward::build_outbound;
use crate::http::request::{InboundRequest, MakeRequestUuid, RequestIdExt};
use crate::http::response::relay;
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::routing::{split_segments, Router as RouteTable, RouteError};

/// Failure while assembling the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid route table: {0}")]
    Routes(#[from] ValidationError),

    #[error("invalid backend origin: {0}")]
    Origin(#[from] url::ParseError),

    #[error("failed to build backend client: {0}")]
    Transport(#[from] ProxyError),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub transport: Arc<dyn Transport>,
    pub origin: Arc<Url>,
    pub mount_prefix: Arc<str>,
    pub max_body_bytes: usize,
}

/// HTTP server for the API proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a server that talks to the configured backend over HTTP.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let transport = Arc::new(HttpTransport::new(&config.backend)?);
        Self::with_transport(config, transport)
    }

    /// Create a server with a caller-supplied transport.
    pub fn with_transport(
        config: ProxyConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ServerError> {
        let state = AppState {
            routes: Arc::new(RouteTable::from_config(&config.routes)?),
            transport,
            origin: Arc::new(Url::parse(&config.backend.origin)?),
            mount_prefix: Arc::from(config.listener.mount_prefix.as_str()),
            max_body_bytes: config.listener.max_body_bytes,
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let prefix = config.listener.mount_prefix.as_str();

        let mut router = Router::new().route("/healthz", get(health));
        router = if prefix == "/" {
            router.fallback(proxy_handler)
        } else {
            router
                .route(prefix, any(proxy_handler))
                .route(&format!("{prefix}/"), any(proxy_handler))
                .route(&format!("{prefix}/{{*path}}"), any(proxy_handler))
                .fallback(not_found)
        };

        router.with_state(state).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request.headers().request_id(),
                    )
                }))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires. In-flight requests are drained before returning.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            mount_prefix = %self.config.listener.mount_prefix,
            origin = %self.config.backend.origin,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The assembled router, for serving in-process.
    pub fn into_router(self) -> Router {
        self.router
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn not_found() -> Response {
    RouteError::NotFound.into_response()
}

/// Main proxy handler: resolve, forward, relay.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request.headers().request_id().to_string();
    let (parts, body) = request.into_parts();
    let method = parts.method.to_string();

    let path = parts.uri.path();
    let below_prefix = path.strip_prefix(&*state.mount_prefix).unwrap_or(path);
    let segments = split_segments(below_prefix);

    // 1. Resolve
    let resolved = match state.routes.resolve(&parts.method, &segments) {
        Ok(resolved) => resolved,
        Err(err) => {
            tracing::warn!(request_id = %request_id, method = %method, path = %path, reason = %err, "Request not routed");
            let response = err.into_response();
            metrics::record_request(&method, response.status().as_u16(), "none", start);
            return response;
        }
    };
    let route_name = resolved.route.name.as_str();

    // 2. Buffer the body
    let bytes = match to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(request_id = %request_id, route = route_name, error = %err, "Failed to read request body");
            let response = body_too_large();
            metrics::record_request(&method, response.status().as_u16(), route_name, start);
            return response;
        }
    };

    // 3. Forward
    let inbound = InboundRequest::from_parts(&parts, bytes, segments);
    let outbound = match build_outbound(&state.origin, &inbound, &resolved) {
        Ok(outbound) => outbound,
        Err(err) => return upstream_failure(err, &request_id, route_name, &method, start),
    };
    let url = outbound.url.to_string();

    tracing::debug!(
        request_id = %request_id,
        route = route_name,
        method = %method,
        url = %url,
        has_body = outbound.body.is_some(),
        "Proxying request"
    );

    // 4. Transport + relay
    match state.transport.send(outbound).await {
        Ok(backend) => {
            let status = backend.status;
            let response = relay(backend, resolved.route).into_response();
            tracing::info!(
                request_id = %request_id,
                route = route_name,
                method = %method,
                url = %url,
                status = status.as_u16(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Backend responded"
            );
            metrics::record_request(&method, status.as_u16(), route_name, start);
            response
        }
        Err(err) => upstream_failure(err, &request_id, route_name, &method, start),
    }
}

fn upstream_failure(
    err: ProxyError,
    request_id: &str,
    route: &str,
    method: &str,
    start: Instant,
) -> Response {
    tracing::error!(request_id = %request_id, route = route, error = %err, "Upstream error");
    metrics::record_upstream_error(route, err.is_timeout());
    let response = err.into_response();
    metrics::record_request(method, response.status().as_u16(), route, start);
    response
}

//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use api_proxy::config::ProxyConfig;
use api_proxy::http::HttpServer;
use api_proxy::lifecycle::Shutdown;
use axum::body::{to_bytes, Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A request as the mock backend received it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// What the mock backend answers with.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub body: String,
    pub location: Option<&'static str>,
    pub delay: Option<Duration>,
}

impl Reply {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: Some("application/json"),
            body: body.to_string(),
            location: None,
            delay: None,
        }
    }

    pub fn text(status: u16, content_type: Option<&'static str>, body: &str) -> Self {
        Self {
            status,
            content_type,
            body: body.to_string(),
            location: None,
            delay: None,
        }
    }

    pub fn with_location(mut self, location: &'static str) -> Self {
        self.location = Some(location);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

type Responder = Arc<dyn Fn(&RecordedRequest) -> Reply + Send + Sync>;

#[derive(Clone)]
struct BackendState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    respond: Responder,
}

/// A programmable backend that records every request it receives.
pub struct MockBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockBackend {
    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn single_request(&self) -> RecordedRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one backend request: {requests:?}");
        requests.into_iter().next().unwrap()
    }
}

/// Start a mock backend on an ephemeral port.
pub async fn start_mock_backend<F>(respond: F) -> MockBackend
where
    F: Fn(&RecordedRequest) -> Reply + Send + Sync + 'static,
{
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = BackendState {
        requests: requests.clone(),
        respond: Arc::new(respond),
    };

    let app = Router::new().fallback(record_and_reply).with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockBackend { addr, requests }
}

async fn record_and_reply(State(state): State<BackendState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let recorded = RecordedRequest {
        method: parts.method,
        path_and_query: parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_default(),
        headers: parts.headers,
        body: to_bytes(body, usize::MAX).await.unwrap(),
    };

    let reply = (state.respond)(&recorded);
    state.requests.lock().unwrap().push(recorded);

    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }

    let mut response = reply.body.into_response();
    *response.status_mut() = StatusCode::from_u16(reply.status).unwrap();
    match reply.content_type {
        Some(ct) => {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        None => {
            response.headers_mut().remove(header::CONTENT_TYPE);
        }
    }
    if let Some(location) = reply.location {
        response
            .headers_mut()
            .insert(header::LOCATION, HeaderValue::from_static(location));
    }
    response
}

/// A running proxy instance.
pub struct TestProxy {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the proxy with default routes in front of `origin`.
pub async fn start_proxy(origin: &str) -> TestProxy {
    let mut config = ProxyConfig::default();
    config.backend.origin = origin.to_string();
    start_proxy_with(config).await
}

/// Start the proxy with an explicit config; the bind address is ignored.
pub async fn start_proxy_with(config: ProxyConfig) -> TestProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestProxy { addr, shutdown }
}

/// A client that never goes through a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Send a request line verbatim, bypassing client-side URL normalization,
/// and return the response status code.
pub async fn raw_request(addr: SocketAddr, method: &str, target: &str) -> u16 {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "{method} {target} HTTP/1.1\r\nHost: {addr}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    let response = String::from_utf8_lossy(&response);
    let status_line = response.lines().next().unwrap_or_default();
    status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap_or_else(|| panic!("malformed response: {response}"))
}

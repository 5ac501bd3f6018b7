//! Inbound request handling.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for every request
//! - Capture the inbound request as an `InboundRequest`
//! - Decode JSON bodies into structured values; keep everything else raw
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Multipart bodies are never decoded
//! - An empty body is the same as no body

use axum::body::Bytes;
use axum::http::{header, request::Parts, HeaderMap, HeaderValue, Method, Request};
use serde_json::Value;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request ID to and from the client.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates `x-request-id` values for requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Convenience accessor for the request ID set by the request-id layer.
pub trait RequestIdExt {
    fn request_id(&self) -> &str;
}

impl RequestIdExt for HeaderMap {
    fn request_id(&self) -> &str {
        self.get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }
}

/// Body of an inbound request.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundBody {
    /// A JSON body that parsed.
    Structured(Value),
    /// Bytes exactly as received.
    Raw(Bytes),
}

/// The inbound request as the forwarder sees it.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    /// Path segments below the mount prefix.
    pub segments: Vec<String>,
    pub headers: HeaderMap,
    pub query: Option<String>,
    pub body: Option<InboundBody>,
}

impl InboundRequest {
    /// Build from request parts, the buffered body and the routed segments.
    pub fn from_parts(parts: &Parts, body: Bytes, segments: Vec<String>) -> Self {
        let body = decode_body(parts.headers.get(header::CONTENT_TYPE), body);
        Self {
            method: parts.method.clone(),
            segments,
            headers: parts.headers.clone(),
            query: parts.uri.query().map(str::to_string),
            body,
        }
    }
}

/// Decode a body according to its declared content-type.
pub fn decode_body(content_type: Option<&HeaderValue>, body: Bytes) -> Option<InboundBody> {
    if body.is_empty() {
        return None;
    }

    let content_type = content_type.and_then(|v| v.to_str().ok()).unwrap_or("");
    if is_multipart(content_type) || !is_json(content_type) {
        return Some(InboundBody::Raw(body));
    }

    match serde_json::from_slice::<Value>(&body) {
        Ok(value) => Some(InboundBody::Structured(value)),
        Err(_) => Some(InboundBody::Raw(body)),
    }
}

pub(crate) fn is_json(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("application/json")
}

pub(crate) fn is_multipart(content_type: &str) -> bool {
    content_type
        .to_ascii_lowercase()
        .contains("multipart/form-data")
}

//! Response relay.
//!
//! # Responsibilities
//! - Copy the backend status through unchanged
//! - Re-emit JSON bodies, degrade malformed JSON to `text/plain`
//! - Pass other bodies through with their content-type (or the route default)
//! - Tag backend 404s so callers can tell them from routing 404s
//! - Keep `location` on redirects that reach the client
//!
//! # Design Decisions
//! - The JSON decision is a plain two-branch `match` on the parse result
//! - Only `content-type` crosses back from the backend, plus `location` on 3xx

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use crate::http::client::BackendResponse;
use crate::http::request::is_json;
use crate::routing::Route;

/// Marker set on 404s that came from the backend.
pub const X_BACKEND_404: HeaderName = HeaderName::from_static("x-backend-404");

/// Body of a relayed response.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayBody {
    /// Backend JSON that parsed; re-emitted as `application/json`.
    Json(Value),
    /// Bytes as received, with the content-type to send them under.
    Text {
        content_type: HeaderValue,
        body: Bytes,
    },
}

/// The client-facing form of a backend response.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayedResponse {
    pub status: StatusCode,
    pub body: RelayBody,
    pub backend_404: bool,
    /// Redirect target, for 3xx responses only.
    pub location: Option<HeaderValue>,
}

/// Turn a backend response into the client response for `route`.
pub fn relay(backend: BackendResponse, route: &Route) -> RelayedResponse {
    let content_type = backend.headers.get(header::CONTENT_TYPE).cloned();
    let declared_json = content_type
        .as_ref()
        .and_then(|v| v.to_str().ok())
        .is_some_and(is_json);

    let body = if declared_json {
        match serde_json::from_slice::<Value>(&backend.body) {
            Ok(value) => RelayBody::Json(value),
            Err(err) => {
                tracing::warn!(
                    status = %backend.status,
                    error = %err,
                    "Backend sent malformed JSON, relaying as text"
                );
                RelayBody::Text {
                    content_type: HeaderValue::from_static("text/plain"),
                    body: backend.body,
                }
            }
        }
    } else {
        RelayBody::Text {
            content_type: content_type.unwrap_or_else(|| route.default_content_type.clone()),
            body: backend.body,
        }
    };

    let location = if backend.status.is_redirection() {
        backend.headers.get(header::LOCATION).cloned()
    } else {
        None
    };

    RelayedResponse {
        status: backend.status,
        body,
        backend_404: route.mark_backend_404 && backend.status == StatusCode::NOT_FOUND,
        location,
    }
}

impl IntoResponse for RelayedResponse {
    fn into_response(self) -> Response {
        let (content_type, body) = match self.body {
            RelayBody::Json(value) => match serde_json::to_vec(&value) {
                Ok(json) => (HeaderValue::from_static("application/json"), Bytes::from(json)),
                // a parsed Value always serializes
                Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            },
            RelayBody::Text { content_type, body } => (content_type, body),
        };

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = self.status;
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type);
        if self.backend_404 {
            response
                .headers_mut()
                .insert(X_BACKEND_404, HeaderValue::from_static("true"));
        }
        if let Some(location) = self.location {
            response.headers_mut().insert(header::LOCATION, location);
        }
        response
    }
}

//! Error envelope.
//!
//! Every response the proxy generates itself (instead of relaying) uses the
//! `{"detail": ...}` shape. Only transport failures produce 502.

use std::error::Error as _;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::routing::RouteError;

/// Failure reaching or reading the backend.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Connect, DNS, timeout, or body read failure.
    #[error("{}", source_chain(.0))]
    Transport(#[from] reqwest::Error),

    #[error("invalid upstream target {0}")]
    InvalidTarget(String),

    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ProxyError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProxyError::Transport(e) if e.is_timeout())
    }
}

/// `reqwest` keeps the useful part ("Connection refused") in the source chain.
fn source_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}

/// JSON body of every proxy-generated response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub detail: String,
}

impl ErrorEnvelope {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let envelope = ErrorEnvelope::new(format!("Proxy error: {self}"));
        (StatusCode::BAD_GATEWAY, Json(envelope)).into_response()
    }
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        match self {
            RouteError::NotFound => {
                (StatusCode::NOT_FOUND, Json(ErrorEnvelope::new("Not found"))).into_response()
            }
            RouteError::MethodNotAllowed { allowed } => {
                let mut response = (
                    StatusCode::METHOD_NOT_ALLOWED,
                    Json(ErrorEnvelope::new("Method Not Allowed")),
                )
                    .into_response();
                let allow = allowed
                    .iter()
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    response.headers_mut().insert(header::ALLOW, value);
                }
                response
            }
        }
    }
}

/// Inbound body exceeded the configured limit or could not be read.
pub fn body_too_large() -> Response {
    (
        StatusCode::PAYLOAD_TOO_LARGE,
        Json(ErrorEnvelope::new("Request body too large")),
    )
        .into_response()
}

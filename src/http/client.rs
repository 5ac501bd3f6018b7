//! Backend transport.
//!
//! # Responsibilities
//! - Send one outbound request and buffer the full response
//! - Surface every failure (DNS, refused, timeout, read) as `ProxyError`
//!
//! # Design Decisions
//! - No retries; one call per inbound request
//! - No deadline unless configured
//! - The returned future is owned by the inbound handler, so dropping the
//!   handler (client went away) cancels the outbound call

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use reqwest::redirect::Policy;

use crate::config::BackendConfig;
use crate::http::error::ProxyError;
use crate::http::forward::OutboundRequest;

/// What came back from the backend.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<BackendResponse, ProxyError>> + Send + 'a>>;

/// Sends an outbound request and awaits the full response.
pub trait Transport: Send + Sync {
    fn send(&self, request: OutboundRequest) -> TransportFuture<'_>;
}

/// Transport backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build the client from backend settings.
    pub fn new(config: &BackendConfig) -> Result<Self, ProxyError> {
        let redirect = if config.redirect_limit == 0 {
            Policy::none()
        } else {
            Policy::limited(config.redirect_limit)
        };

        let mut builder = reqwest::Client::builder()
            .redirect(redirect)
            .no_proxy();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    async fn execute(&self, request: OutboundRequest) -> Result<BackendResponse, ProxyError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(BackendResponse {
            status,
            headers,
            body,
        })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: OutboundRequest) -> TransportFuture<'_> {
        Box::pin(self.execute(request))
    }
}

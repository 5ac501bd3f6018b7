//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, route, status
//! - `proxy_request_duration_seconds` (histogram): end-to-end latency
//! - `proxy_upstream_errors_total` (counter): transport failures by route
//!
//! Without an installed recorder every call is a no-op, so handlers record
//! unconditionally.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::Label;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a finished request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    let labels = vec![
        Label::new("method", method.to_string()),
        Label::new("status", status.to_string()),
        Label::new("route", route.to_string()),
    ];
    metrics::counter!("proxy_requests_total", labels.clone()).increment(1);
    metrics::histogram!("proxy_request_duration_seconds", labels)
        .record(start.elapsed().as_secs_f64());
}

/// Record a transport failure.
pub fn record_upstream_error(route: &str, timeout: bool) {
    metrics::counter!(
        "proxy_upstream_errors_total",
        "route" => route.to_string(),
        "kind" => if timeout { "timeout" } else { "transport" }
    )
    .increment(1);
}

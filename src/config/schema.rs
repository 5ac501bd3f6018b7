//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the API proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, mount prefix, body limit).
    pub listener: ListenerConfig,

    /// Upstream backend the proxy forwards to.
    pub backend: BackendConfig,

    /// Declarative route table. Empty in a config file means "use defaults".
    pub routes: Vec<RouteConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            backend: BackendConfig::default(),
            routes: default_routes(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// Fill in the default route table when none was declared.
    pub fn with_default_routes(mut self) -> Self {
        if self.routes.is_empty() {
            self.routes = default_routes();
        }
        self
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Path prefix the proxy is mounted under (e.g., "/api").
    pub mount_prefix: String,

    /// Maximum inbound body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            mount_prefix: "/api".to_string(),
            max_body_bytes: 50 * 1024 * 1024, // audio uploads
        }
    }
}

/// Upstream backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend origin, scheme + authority (e.g., "https://api.example.com").
    pub origin: String,

    /// Total request timeout in seconds. `None` keeps the client default (no deadline).
    pub timeout_secs: Option<u64>,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: Option<u64>,

    /// Maximum redirects to follow. `0` relays redirects to the caller.
    pub redirect_limit: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            origin: "http://127.0.0.1:8000".to_string(),
            timeout_secs: None,
            connect_timeout_secs: None,
            redirect_limit: 10,
        }
    }
}

/// How a route's path is compared against the inbound segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Segments must be equal.
    Exact,
    /// Route segments must be a prefix of the inbound segments.
    #[default]
    Prefix,
}

/// One row of the route table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Path below the mount prefix, without leading or trailing slash ("" = everything).
    #[serde(default)]
    pub path: String,

    #[serde(default, rename = "match")]
    pub match_kind: MatchKind,

    /// Allowed methods. Empty allows any method.
    #[serde(default)]
    pub methods: Vec<String>,

    /// Methods that get a trailing slash appended to the backend path (exact routes only).
    #[serde(default)]
    pub trailing_slash_methods: Vec<String>,

    /// Reject with 404 when nothing follows the route path.
    #[serde(default)]
    pub require_subpath: bool,

    /// Inbound headers copied to the backend request.
    #[serde(default = "default_forward_headers")]
    pub forward_headers: Vec<String>,

    /// Content-type used when the backend response has none.
    #[serde(default = "default_content_type")]
    pub default_content_type: String,

    /// Tag backend 404 responses with `x-backend-404: true`.
    #[serde(default = "default_true")]
    pub mark_backend_404: bool,
}

impl RouteConfig {
    /// A prefix route with the canonical header policy.
    pub fn prefix(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            match_kind: MatchKind::Prefix,
            methods: Vec::new(),
            trailing_slash_methods: Vec::new(),
            require_subpath: false,
            forward_headers: default_forward_headers(),
            default_content_type: default_content_type(),
            mark_backend_404: true,
        }
    }

    /// An exact route with the canonical header policy.
    pub fn exact(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            match_kind: MatchKind::Exact,
            ..Self::prefix(name, path)
        }
    }
}

/// Headers that may ever cross from client to backend.
pub const FORWARDABLE_HEADERS: [&str; 2] = ["content-type", "accept"];

fn default_forward_headers() -> Vec<String> {
    FORWARDABLE_HEADERS.iter().map(|h| h.to_string()).collect()
}

fn default_content_type() -> String {
    "text/plain".to_string()
}

fn default_true() -> bool {
    true
}

/// The route table used when the configuration declares none.
///
/// `POST projects` is the backend's create-in-collection endpoint and is the
/// only call that must carry a trailing slash; the backend answers a slash
/// mismatch with a redirect, and the redirected request loses its body.
pub fn default_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig {
            methods: vec!["GET".into(), "POST".into()],
            trailing_slash_methods: vec!["POST".into()],
            default_content_type: "application/json".into(),
            ..RouteConfig::exact("projects-collection", "projects")
        },
        RouteConfig {
            require_subpath: true,
            default_content_type: "application/json".into(),
            ..RouteConfig::prefix("project-resource", "projects")
        },
        RouteConfig {
            require_subpath: true,
            ..RouteConfig::prefix("backend", "")
        },
    ]
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

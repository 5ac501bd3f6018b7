//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, addresses parse)
//! - Keep the route table within the forwarding invariants
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::{HeaderValue, Method};
use thiserror::Error;
use url::Url;

use crate::config::schema::{MatchKind, ProxyConfig, RouteConfig, FORWARDABLE_HEADERS};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field} address '{value}'")]
    Address { field: &'static str, value: String },

    #[error("mount_prefix '{0}' must start with '/' and not end with '/'")]
    MountPrefix(String),

    #[error("max_body_bytes must be greater than zero")]
    BodyLimit,

    #[error("backend origin '{origin}': {reason}")]
    Origin { origin: String, reason: String },

    #[error("backend {0} must be greater than zero")]
    Timeout(&'static str),

    #[error("log_format '{0}' must be 'pretty' or 'json'")]
    LogFormat(String),

    #[error("route #{0} has an empty name")]
    RouteName(usize),

    #[error("route '{0}' is declared more than once")]
    DuplicateRoute(String),

    #[error("route '{route}': path '{path}' must not start or end with '/'")]
    RoutePath { route: String, path: String },

    #[error("route '{route}': '{method}' is not an HTTP method")]
    Method { route: String, method: String },

    #[error("route '{0}': trailing_slash_methods requires match = \"exact\"")]
    TrailingSlashOnPrefix(String),

    #[error("route '{route}': trailing slash method '{method}' is not in methods")]
    TrailingSlashMethod { route: String, method: String },

    #[error("route '{route}': header '{header}' may not be forwarded")]
    ForwardHeader { route: String, header: String },

    #[error("route '{route}': default_content_type '{value}' is not a valid header value")]
    ContentType { route: String, value: String },
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address("listener.bind_address", &config.listener.bind_address, &mut errors);
    if config.observability.metrics_enabled {
        check_address(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
    }

    let prefix = &config.listener.mount_prefix;
    if !prefix.starts_with('/') || (prefix.len() > 1 && prefix.ends_with('/')) {
        errors.push(ValidationError::MountPrefix(prefix.clone()));
    }

    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::BodyLimit);
    }

    if let Err(reason) = check_origin(&config.backend.origin) {
        errors.push(ValidationError::Origin {
            origin: config.backend.origin.clone(),
            reason,
        });
    }
    if config.backend.timeout_secs == Some(0) {
        errors.push(ValidationError::Timeout("timeout_secs"));
    }
    if config.backend.connect_timeout_secs == Some(0) {
        errors.push(ValidationError::Timeout("connect_timeout_secs"));
    }

    let format = config.observability.log_format.as_str();
    if format != "pretty" && format != "json" {
        errors.push(ValidationError::LogFormat(format.to_string()));
    }

    let mut seen = HashSet::new();
    for (index, route) in config.routes.iter().enumerate() {
        if route.name.trim().is_empty() {
            errors.push(ValidationError::RouteName(index));
        } else if !seen.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.name.clone()));
        }
        validate_route(route, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Address {
            field,
            value: value.to_string(),
        });
    }
}

fn check_origin(origin: &str) -> Result<(), String> {
    let url = Url::parse(origin).map_err(|e| e.to_string())?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err("must not carry a query or fragment".to_string());
    }
    Ok(())
}

fn validate_route(route: &RouteConfig, errors: &mut Vec<ValidationError>) {
    if route.path.starts_with('/') || route.path.ends_with('/') {
        errors.push(ValidationError::RoutePath {
            route: route.name.clone(),
            path: route.path.clone(),
        });
    }

    for method in route.methods.iter().chain(&route.trailing_slash_methods) {
        if Method::from_bytes(method.to_ascii_uppercase().as_bytes()).is_err() {
            errors.push(ValidationError::Method {
                route: route.name.clone(),
                method: method.clone(),
            });
        }
    }

    if !route.trailing_slash_methods.is_empty() {
        if route.match_kind != MatchKind::Exact {
            errors.push(ValidationError::TrailingSlashOnPrefix(route.name.clone()));
        }
        if !route.methods.is_empty() {
            for method in &route.trailing_slash_methods {
                if !route.methods.iter().any(|m| m.eq_ignore_ascii_case(method)) {
                    errors.push(ValidationError::TrailingSlashMethod {
                        route: route.name.clone(),
                        method: method.clone(),
                    });
                }
            }
        }
    }

    for header in &route.forward_headers {
        let allowed = FORWARDABLE_HEADERS
            .iter()
            .any(|h| h.eq_ignore_ascii_case(header));
        if !allowed {
            errors.push(ValidationError::ForwardHeader {
                route: route.name.clone(),
                header: header.clone(),
            });
        }
    }

    if HeaderValue::from_str(&route.default_content_type).is_err() {
        errors.push(ValidationError::ContentType {
            route: route.name.clone(),
            value: route.default_content_type.clone(),
        });
    }
}

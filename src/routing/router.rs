//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Compile `RouteConfig` rows into an immutable route table
//! - Resolve method + path segments to a route and a backend path
//! - Apply the trailing-slash policy
//! - Reject with an explicit 404/405 before the backend is contacted
//! - Refuse dot segments, so the backend path is exactly what was routed
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan over routes (acceptable for typical route counts)
//! - Most specific match wins; exact beats prefix; then declaration order

use axum::http::{HeaderName, HeaderValue, Method};
use thiserror::Error;

use crate::config::{MatchKind, RouteConfig, ValidationError};
use crate::routing::matcher::{is_dot_segment, PathMatcher};

/// A compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    pub name: String,
    matcher: PathMatcher,
    methods: Vec<Method>,
    trailing_slash_methods: Vec<Method>,
    require_subpath: bool,
    pub forward_headers: Vec<HeaderName>,
    pub default_content_type: HeaderValue,
    pub mark_backend_404: bool,
}

impl Route {
    pub fn from_config(config: &RouteConfig) -> Result<Self, ValidationError> {
        let parse_methods = |methods: &[String]| {
            methods
                .iter()
                .map(|m| {
                    Method::from_bytes(m.to_ascii_uppercase().as_bytes()).map_err(|_| {
                        ValidationError::Method {
                            route: config.name.clone(),
                            method: m.clone(),
                        }
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        };

        let forward_headers = config
            .forward_headers
            .iter()
            .map(|h| {
                HeaderName::from_bytes(h.to_ascii_lowercase().as_bytes()).map_err(|_| {
                    ValidationError::ForwardHeader {
                        route: config.name.clone(),
                        header: h.clone(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let default_content_type =
            HeaderValue::from_str(&config.default_content_type).map_err(|_| {
                ValidationError::ContentType {
                    route: config.name.clone(),
                    value: config.default_content_type.clone(),
                }
            })?;

        let route = Self {
            name: config.name.clone(),
            matcher: PathMatcher::new(&config.path, config.match_kind),
            methods: parse_methods(&config.methods)?,
            trailing_slash_methods: parse_methods(&config.trailing_slash_methods)?,
            require_subpath: config.require_subpath,
            forward_headers,
            default_content_type,
            mark_backend_404: config.mark_backend_404,
        };

        if !route.trailing_slash_methods.is_empty() && route.matcher.kind() != MatchKind::Exact {
            return Err(ValidationError::TrailingSlashOnPrefix(route.name));
        }

        Ok(route)
    }

    /// Empty `methods` accepts anything.
    fn allows(&self, method: &Method) -> bool {
        self.methods.is_empty() || self.methods.contains(method)
    }
}

/// Why a request could not be routed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// No route, or a required sub-path is missing.
    #[error("Not found")]
    NotFound,

    /// The route exists but does not accept the method.
    #[error("Method Not Allowed")]
    MethodNotAllowed { allowed: Vec<Method> },
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone)]
pub struct ResolvedRoute<'a> {
    pub route: &'a Route,
    /// Segments joined with `/`, no leading slash.
    pub backend_path: String,
    pub trailing_slash: bool,
}

impl ResolvedRoute<'_> {
    /// Path to append to the backend origin, slash policy applied.
    pub fn target_path(&self) -> String {
        if self.trailing_slash {
            format!("{}/", self.backend_path)
        } else {
            self.backend_path.clone()
        }
    }
}

/// The compiled route table.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Compile a route table from configuration.
    pub fn from_config(routes: &[RouteConfig]) -> Result<Self, ValidationError> {
        let routes = routes
            .iter()
            .map(Route::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { routes })
    }

    /// Resolve a method and the path segments below the mount prefix.
    pub fn resolve(
        &self,
        method: &Method,
        segments: &[String],
    ) -> Result<ResolvedRoute<'_>, RouteError> {
        if segments.iter().any(|s| is_dot_segment(s)) {
            return Err(RouteError::NotFound);
        }

        let mut best: Option<&Route> = None;
        for route in self.routes.iter().filter(|r| r.matcher.matches(segments)) {
            // strictly greater keeps the first declared route on ties
            if best.map_or(true, |b| route.matcher.rank() > b.matcher.rank()) {
                best = Some(route);
            }
        }
        let route = best.ok_or(RouteError::NotFound)?;

        if route.require_subpath && route.matcher.remainder(segments).is_empty() {
            return Err(RouteError::NotFound);
        }

        if !route.allows(method) {
            return Err(RouteError::MethodNotAllowed {
                allowed: route.methods.clone(),
            });
        }

        Ok(ResolvedRoute {
            route,
            backend_path: segments.join("/"),
            trailing_slash: route.trailing_slash_methods.contains(method),
        })
    }
}

//! Reverse proxy in front of the QC tool backend API.
//!
//! Requests under the mount prefix are resolved against a declarative route
//! table, rebuilt with an allow-listed set of headers, sent to the backend
//! origin, and the backend response is relayed back.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;

//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → routing (resolve method + path, 404/405 short-circuit)
//!     → request.rs (capture InboundRequest, decode JSON bodies)
//!     → forward.rs (target URL, header allow-list, body encoding)
//!     → client.rs (one backend call, full response)
//!     → response.rs (relay status + body, JSON degrade)
//!     → error.rs (502 envelope on transport failure)
//!     → Send to client
//! ```

pub mod client;
pub mod error;
pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use client::{BackendResponse, HttpTransport, Transport};
pub use error::{ErrorEnvelope, ProxyError};
pub use forward::OutboundRequest;
pub use request::{InboundBody, InboundRequest, X_REQUEST_ID};
pub use server::{HttpServer, ServerError};

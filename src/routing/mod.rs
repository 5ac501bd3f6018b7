//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path below the mount prefix)
//!     → matcher.rs (split segments, evaluate match conditions)
//!     → router.rs (pick most specific route, check method, slash policy)
//!     → Return: ResolvedRoute or RouteError (404/405)
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Parse methods, header names, content types
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (segment comparison only)
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;

pub use matcher::split_segments;
pub use router::{ResolvedRoute, Route, RouteError, Router};

//! # Node API Client
//!
//! Typed HTTP client for the node's versioned REST API. One async
//! method per API operation; each returns the parsed JSON body or an
//! [`ApiError`]. Protocol rejections (non-2xx) carry the node's own
//! error body in the exact `"Error calling <Op>: <body>\n"` form that
//! the conformance suites compare against.
//!
//! ## Modules
//! - `error`: the `ApiError` taxonomy
//! - `models`: serde model types for responses the harness inspects
//!   structurally (blocks, connections, transactions, ...)
//!
//! The client performs no retries and holds no state beyond the base
//! URL and the underlying connection pool. Timeouts are configured on
//! construction.

pub mod error;
pub mod models;

mod client;

pub use client::{ApiClient, DEFAULT_TIMEOUT_SECS};
pub use error::ApiError;

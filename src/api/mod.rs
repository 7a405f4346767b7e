//! HTTP transport for path queries.

pub mod http;
pub mod types;

pub use http::HttpServer;
pub use types::{ErrorBody, FindPathRequest, FindPathResponse};

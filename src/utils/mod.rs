//! Utility modules for common functionality.
//!
//! - http: retryable HTTP client construction
//! - logging: tracing setup and the error context shared by the error types
//! - parsing: tolerant numeric, amount and timestamp parsing
//! - retry: linear backoff between failover attempts

pub mod http;
pub mod logging;
pub mod parsing;
pub mod retry;

pub use http::{create_retryable_http_client, HttpRetryConfig};
pub use retry::backoff_delay;

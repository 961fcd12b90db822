//! Core domain models for the access layer.
//!
//! - Endpoints: remote nodes and the protocol addresses they expose
//! - Client configuration: endpoint list plus timeout, retry and health-check settings
//! - State anchors: height-or-hash pins for reproducible state queries

mod anchor;
mod endpoint;

pub use anchor::StateAnchor;
pub use endpoint::{
	ClientConfig, Endpoint, DEFAULT_HEALTH_CHECK_INTERVAL, DEFAULT_RETRY_ATTEMPTS,
	DEFAULT_RETRY_BACKOFF, DEFAULT_TIMEOUT,
};

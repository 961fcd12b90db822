//! Blockchain client implementations.
//!
//! - JSON-RPC client, the primary protocol covering the whole contract
//! - REST client, a fallback protocol covering a subset of it
//! - WebSocket client, serving subscriptions only
//! - Failover client composing several endpoints

pub(crate) mod decode;

mod fallback {
	pub mod client;
	pub mod health;
}
mod jsonrpc {
	pub mod client;
}
mod rest {
	pub mod client;
}
mod ws {
	pub mod client;
	pub mod subscription;
}

pub use fallback::{
	client::{FallbackClient, FALLBACK_TRANSPORT},
	health::{EndpointHealth, EndpointStatus, HEALTH_CHECK_TIMEOUT},
};
pub use jsonrpc::client::{JsonRpcClient, JSONRPC_TRANSPORT};
pub use rest::client::{RestClient, REST_TRANSPORT};
pub use ws::{
	client::{WsSubscriptionClient, WS_TRANSPORT},
	subscription::Subscription,
};

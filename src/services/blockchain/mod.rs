//! Blockchain client interfaces and implementations.
//!
//! Provides the capability contract shared by every client and its implementations:
//!
//! - Client trait and per-call context
//! - Protocol clients (JSON-RPC, REST, WebSocket subscriptions)
//! - Failover client over prioritized endpoints
//! - Network transports
//! - Error handling for blockchain operations

mod client;
mod clients;
mod context;
mod error;
mod factory;
mod transports;

pub use client::{BlockChainClient, SharedClient};
pub use clients::{
	EndpointHealth, EndpointStatus, FallbackClient, JsonRpcClient, RestClient, Subscription,
	WsSubscriptionClient, FALLBACK_TRANSPORT, HEALTH_CHECK_TIMEOUT, JSONRPC_TRANSPORT,
	REST_TRANSPORT, WS_TRANSPORT,
};
pub use context::CallContext;
pub use error::{
	classify_rpc_error, is_business_message, rpc_codes, BlockChainError, ErrorKind,
	FailureDisposition,
};
pub use factory::{create_client, create_subscription_client};
pub use transports::{BlockchainTransport, HttpTransportClient, TransportError, WsConfig};

//! Network transports used by the protocol clients.
//!
//! - HTTP transport carrying JSON-RPC envelopes
//! - WebSocket configuration for the subscription client

mod error;
mod http;

pub mod ws {
	pub mod config;
}

pub use error::TransportError;
pub use http::HttpTransportClient;
pub use ws::config::WsConfig;

use serde_json::{json, Value};

/// Base trait for transports carrying JSON-RPC requests
#[async_trait::async_trait]
pub trait BlockchainTransport: Send + Sync {
	/// Get the URL requests are sent to
	async fn get_current_url(&self) -> String;

	/// Sends a request and returns the full response envelope
	///
	/// Protocol errors inside the envelope are not interpreted here.
	async fn send_raw_request(&self, method: &str, params: Value) -> Result<Value, TransportError>;

	/// Builds the request envelope
	fn customize_request(&self, id: u64, method: &str, params: Value) -> Value {
		json!({
			"jsonrpc": "2.0",
			"id": id,
			"method": method,
			"params": params
		})
	}
}

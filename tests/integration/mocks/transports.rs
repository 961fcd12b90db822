use async_trait::async_trait;
use mockall::mock;
use serde_json::Value;

use chain_access::services::blockchain::{BlockchainTransport, TransportError};

// Mock implementation of the JSON-RPC transport.
// Returns scripted response envelopes so the JSON-RPC client can be tested without HTTP.
mock! {
	pub JsonRpcTransport {}

	#[async_trait]
	impl BlockchainTransport for JsonRpcTransport {
		async fn get_current_url(&self) -> String;
		async fn send_raw_request(&self, method: &str, params: Value) -> Result<Value, TransportError>;
	}
}

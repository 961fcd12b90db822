//! Blockchain client factory implementation.
//!
//! Picks the protocol client for an endpoint from the addresses it exposes, abstracting away the
//! specifics of client initialization.

use std::{sync::Arc, time::Duration};

use crate::{
	models::Endpoint,
	services::blockchain::{
		clients::{JsonRpcClient, RestClient, WsSubscriptionClient},
		transports::WsConfig,
		BlockChainError, SharedClient,
	},
	utils::HttpRetryConfig,
};

/// Creates the request/response client of an endpoint
///
/// The JSON-RPC address wins when both are configured; the REST address is used otherwise.
///
/// # Arguments
/// * `endpoint` - Endpoint configuration
/// * `timeout` - Per-request timeout
/// * `retry_config` - Transport-level retry policy
///
/// # Returns
/// * `Result<SharedClient, BlockChainError>` - Initialized client or a configuration error
pub fn create_client(
	endpoint: &Endpoint,
	timeout: Duration,
	retry_config: &HttpRetryConfig,
) -> Result<SharedClient, BlockChainError> {
	if let Some(address) = &endpoint.primary_address {
		let client = JsonRpcClient::new(address, timeout, retry_config)?;
		return Ok(Arc::new(client));
	}
	if let Some(address) = &endpoint.secondary_address {
		let client = RestClient::new(address, timeout, retry_config)?;
		return Ok(Arc::new(client));
	}
	Err(BlockChainError::config(
		format!(
			"Endpoint '{}' has neither a primary nor a secondary address",
			endpoint.name
		),
		None,
	))
}

/// Connects the subscription client of an endpoint
pub async fn create_subscription_client(
	endpoint: &Endpoint,
	config: WsConfig,
) -> Result<WsSubscriptionClient, BlockChainError> {
	let address = endpoint.streaming_address.as_deref().ok_or_else(|| {
		BlockChainError::config(
			format!("Endpoint '{}' has no streaming address", endpoint.name),
			None,
		)
	})?;
	WsSubscriptionClient::connect(address, config).await
}

//! HTTP transport implementation for JSON-RPC requests.
//!
//! One pooled client per endpoint address, with the transport-level retry middleware and a
//! per-instance request id counter.

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use std::{
	collections::HashMap,
	sync::atomic::{AtomicU64, Ordering},
	time::Duration,
};
use url::Url;

use crate::{
	services::blockchain::{
		transports::{BlockchainTransport, TransportError},
		BlockChainError,
	},
	utils::{create_retryable_http_client, HttpRetryConfig},
};

/// HTTP transport client for JSON-RPC interactions
#[derive(Debug)]
pub struct HttpTransportClient {
	client: ClientWithMiddleware,
	url: String,
	request_id_counter: AtomicU64,
}

impl HttpTransportClient {
	/// Creates a transport for `url`
	///
	/// # Arguments
	/// * `url` - Address of the JSON-RPC endpoint
	/// * `timeout` - Per-request timeout
	/// * `retry_config` - Transport-level retry policy for transient failures
	pub fn new(
		url: &str,
		timeout: Duration,
		retry_config: &HttpRetryConfig,
	) -> Result<Self, BlockChainError> {
		let parsed = Url::parse(url).map_err(|e| {
			BlockChainError::config(format!("Invalid address '{}'", url), Some(Box::new(e)))
		})?;

		let base_client = reqwest::ClientBuilder::new()
			.timeout(timeout)
			.build()
			.map_err(|e| {
				BlockChainError::config("Failed to create HTTP client", Some(Box::new(e)))
			})?;

		let client = create_retryable_http_client(retry_config, base_client);

		Ok(Self {
			client,
			url: parsed.to_string(),
			request_id_counter: AtomicU64::new(0),
		})
	}

	fn next_id(&self) -> u64 {
		self.request_id_counter.fetch_add(1, Ordering::Relaxed) + 1
	}
}

#[async_trait]
impl BlockchainTransport for HttpTransportClient {
	async fn get_current_url(&self) -> String {
		self.url.clone()
	}

	/// Posts the JSON-RPC envelope and returns the decoded response body
	///
	/// A non-2xx answer whose body is still a JSON-RPC error envelope is returned as is so the
	/// caller can classify the protocol error.
	async fn send_raw_request(&self, method: &str, params: Value) -> Result<Value, TransportError> {
		let request_body = self.customize_request(self.next_id(), method, params);
		let metadata = HashMap::from([
			("url".to_string(), self.url.clone()),
			("method".to_string(), method.to_string()),
		]);

		let body = serde_json::to_string(&request_body).map_err(|e| {
			TransportError::request_serialization(
				"Failed to serialize request JSON",
				Some(Box::new(e)),
				Some(metadata.clone()),
			)
		})?;

		let response = self
			.client
			.post(self.url.as_str())
			.header("Content-Type", "application/json")
			.body(body)
			.send()
			.await
			.map_err(|e| {
				TransportError::network(
					"Failed to send request",
					Some(Box::new(e)),
					Some(metadata.clone()),
				)
			})?;

		let status = response.status();
		let bytes = response.bytes().await.map_err(|e| {
			TransportError::network(
				"Failed to read response body",
				Some(Box::new(e)),
				Some(metadata.clone()),
			)
		})?;

		if !status.is_success() {
			if let Ok(envelope) = serde_json::from_slice::<Value>(&bytes) {
				if envelope.get("error").is_some_and(Value::is_object) {
					return Ok(envelope);
				}
			}
			let error_body = String::from_utf8_lossy(&bytes).to_string();
			tracing::warn!(
				url = %self.url,
				method,
				status = status.as_u16(),
				"Request failed: {}",
				error_body
			);
			return Err(TransportError::http(
				status.as_u16(),
				self.url.clone(),
				error_body,
				Some(metadata),
			));
		}

		serde_json::from_slice(&bytes).map_err(|e| {
			TransportError::response_parse(
				"Failed to parse JSON response",
				Some(Box::new(e)),
				Some(metadata),
			)
		})
	}
}

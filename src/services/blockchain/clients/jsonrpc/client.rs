//! JSON-RPC over HTTP client.
//!
//! The primary protocol client: implements the whole capability contract except subscriptions,
//! which need the streaming client.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::instrument;

use crate::{
	models::{
		Balance, Block, BlockHeader, CallRequest, CallResult, ContractMetadata, FeeEstimate,
		MerkleProof, Receipt, SendTxResult, StateAnchor, SubscriptionType, SyncStatus,
		TokenBalance, TokenBalanceRequest, Transaction, TransferRequest, TxHistoryQuery,
		TxPoolContent, TxPoolStatus, UnsignedTx, Utxo, DEFAULT_HISTORY_LIMIT,
	},
	services::blockchain::{
		clients::decode,
		transports::{BlockchainTransport, HttpTransportClient},
		classify_rpc_error, rpc_codes, BlockChainClient, BlockChainError, CallContext,
		Subscription,
	},
	utils::{parsing::to_hex_u64, HttpRetryConfig},
};

/// Transport name reported in [`BlockChainError::Unsupported`]
pub const JSONRPC_TRANSPORT: &str = "jsonrpc";

/// Appends the anchor object to positional params when one is given
fn with_anchor(mut params: Vec<Value>, anchor: Option<StateAnchor>) -> Value {
	if let Some(anchor) = anchor {
		params.push(anchor.to_rpc_param());
	}
	Value::Array(params)
}

fn require_non_empty(name: &str, value: &str) -> Result<(), BlockChainError> {
	if value.trim().is_empty() {
		return Err(BlockChainError::invalid_params(
			format!("{} must not be empty", name),
			None,
			None,
		));
	}
	Ok(())
}

/// Client for nodes speaking JSON-RPC 2.0 over HTTP
///
/// Generic over its transport so tests can substitute the HTTP layer.
pub struct JsonRpcClient<T: BlockchainTransport> {
	transport: T,
}

impl<T: BlockchainTransport> JsonRpcClient<T> {
	/// Creates a new client instance with a specific transport
	pub fn new_with_transport(transport: T) -> Self {
		Self { transport }
	}

	pub fn transport(&self) -> &T {
		&self.transport
	}

	/// Sends one request and returns its raw `result`
	///
	/// Transport failures surface as network or malformed-response errors. An `error` member
	/// is classified by code and message. A missing `result` member is a malformed response.
	pub async fn request(
		&self,
		ctx: &CallContext,
		method: &str,
		params: Value,
	) -> Result<Value, BlockChainError> {
		let mut response = ctx
			.run(async {
				self.transport
					.send_raw_request(method, params)
					.await
					.map_err(BlockChainError::from)
			})
			.await?;

		if let Some(error) = response.get("error").filter(|error| !error.is_null()) {
			let code = error
				.get("code")
				.and_then(Value::as_i64)
				.unwrap_or(rpc_codes::INTERNAL_ERROR);
			let message = error
				.get("message")
				.and_then(Value::as_str)
				.unwrap_or("unknown error");
			return Err(classify_rpc_error(
				code,
				message,
				error.get("data").cloned(),
				method,
			));
		}

		response
			.as_object_mut()
			.and_then(|envelope| envelope.remove("result"))
			.ok_or_else(|| {
				BlockChainError::malformed_response(
					format!("Response to {} has neither result nor error", method),
					None,
					None,
				)
			})
	}

	/// Like [`Self::request`], with a `null` result reported as `NotFound`
	async fn lookup(
		&self,
		ctx: &CallContext,
		method: &str,
		params: Value,
		resource: impl FnOnce() -> String,
	) -> Result<Value, BlockChainError> {
		let result = self.request(ctx, method, params).await?;
		if result.is_null() {
			return Err(BlockChainError::not_found(resource()));
		}
		Ok(result)
	}
}

impl JsonRpcClient<HttpTransportClient> {
	/// Creates a client for the JSON-RPC endpoint at `url`
	///
	/// # Arguments
	/// * `url` - Endpoint address
	/// * `timeout` - Per-request timeout
	/// * `retry_config` - Transport-level retry policy
	pub fn new(
		url: &str,
		timeout: Duration,
		retry_config: &HttpRetryConfig,
	) -> Result<Self, BlockChainError> {
		Ok(Self::new_with_transport(HttpTransportClient::new(
			url,
			timeout,
			retry_config,
		)?))
	}
}

#[async_trait]
impl<T: BlockchainTransport> BlockChainClient for JsonRpcClient<T> {
	#[instrument(skip(self, ctx))]
	async fn chain_id(&self, ctx: &CallContext) -> Result<String, BlockChainError> {
		let result = self.request(ctx, "wes_chainId", json!([])).await?;
		decode::decode_chain_id(&result)
	}

	#[instrument(skip(self, ctx))]
	async fn syncing(&self, ctx: &CallContext) -> Result<SyncStatus, BlockChainError> {
		let result = self.request(ctx, "wes_syncing", json!([])).await?;
		decode::decode_sync_status(&result)
	}

	#[instrument(skip(self, ctx))]
	async fn block_number(&self, ctx: &CallContext) -> Result<u64, BlockChainError> {
		let result = self.request(ctx, "wes_blockNumber", json!([])).await?;
		decode::decode_height(&result)
	}

	#[instrument(skip(self, ctx))]
	async fn get_block_by_height(
		&self,
		ctx: &CallContext,
		height: u64,
		full_tx: bool,
		anchor: Option<StateAnchor>,
	) -> Result<Block, BlockChainError> {
		let params = with_anchor(vec![json!(to_hex_u64(height)), json!(full_tx)], anchor);
		let result = self
			.lookup(ctx, "wes_getBlockByHeight", params, || {
				format!("block at height {}", height)
			})
			.await?;
		let mut block = decode::decode_block(&result)?;
		decode::enforce_height("block", &mut block.height, Some(height))?;
		Ok(block)
	}

	#[instrument(skip(self, ctx))]
	async fn get_block_by_hash(
		&self,
		ctx: &CallContext,
		hash: &str,
		full_tx: bool,
	) -> Result<Block, BlockChainError> {
		require_non_empty("block hash", hash)?;
		let result = self
			.lookup(ctx, "wes_getBlockByHash", json!([hash, full_tx]), || {
				format!("block {}", hash)
			})
			.await?;
		decode::decode_block(&result)
	}

	#[instrument(skip(self, ctx, signed_tx))]
	async fn send_raw_transaction(
		&self,
		ctx: &CallContext,
		signed_tx: &str,
	) -> Result<SendTxResult, BlockChainError> {
		require_non_empty("signed transaction", signed_tx)?;
		match self
			.request(ctx, "wes_sendRawTransaction", json!([signed_tx]))
			.await
		{
			Ok(result) => decode::decode_send_result(&result),
			Err(BlockChainError::Business { message, .. }) => Ok(SendTxResult::rejected(message)),
			Err(error) => Err(error),
		}
	}

	#[instrument(skip(self, ctx))]
	async fn send_transaction(
		&self,
		ctx: &CallContext,
		request: &TransferRequest,
	) -> Result<SendTxResult, BlockChainError> {
		require_non_empty("from address", &request.from)?;
		require_non_empty("to address", &request.to)?;
		require_non_empty("amount", &request.amount)?;

		let mut transfer = Map::new();
		transfer.insert("fromAddress".to_string(), json!(request.from));
		transfer.insert("toAddress".to_string(), json!(request.to));
		transfer.insert("amount".to_string(), json!(request.amount));
		if let Some(fee) = &request.fee {
			transfer.insert("fee".to_string(), json!(fee));
		}

		match self
			.request(ctx, "wes_sendTransaction", json!([transfer]))
			.await
		{
			Ok(result) => decode::decode_send_result(&result),
			Err(BlockChainError::Business { message, .. }) => Ok(SendTxResult::rejected(message)),
			Err(error) => Err(error),
		}
	}

	#[instrument(skip(self, ctx))]
	async fn get_transaction(
		&self,
		ctx: &CallContext,
		tx_hash: &str,
	) -> Result<Transaction, BlockChainError> {
		require_non_empty("transaction hash", tx_hash)?;
		let result = self
			.lookup(ctx, "wes_getTransactionByHash", json!([tx_hash]), || {
				format!("transaction {}", tx_hash)
			})
			.await?;
		decode::decode_transaction(&result)
	}

	#[instrument(skip(self, ctx))]
	async fn get_transaction_receipt(
		&self,
		ctx: &CallContext,
		tx_hash: &str,
	) -> Result<Receipt, BlockChainError> {
		require_non_empty("transaction hash", tx_hash)?;
		let result = self
			.lookup(ctx, "wes_getTransactionReceipt", json!([tx_hash]), || {
				format!("receipt of {}", tx_hash)
			})
			.await?;
		decode::decode_receipt(&result)
	}

	#[instrument(skip(self, ctx))]
	async fn get_transaction_history(
		&self,
		ctx: &CallContext,
		query: &TxHistoryQuery,
	) -> Result<Vec<Transaction>, BlockChainError> {
		let mut filters = Map::new();
		if let Some(tx_id) = query.tx_id.as_deref().filter(|id| !id.is_empty()) {
			filters.insert("txId".to_string(), json!(tx_id));
		}
		if let Some(resource_id) = query.resource_id.as_deref().filter(|id| !id.is_empty()) {
			filters.insert("resourceId".to_string(), json!(resource_id));
		}
		let limit = if query.limit == 0 {
			DEFAULT_HISTORY_LIMIT
		} else {
			query.limit
		};
		filters.insert("limit".to_string(), json!(limit));
		filters.insert("offset".to_string(), json!(query.offset));

		let result = self
			.request(
				ctx,
				"wes_getTransactionHistory",
				json!([{ "filters": filters }]),
			)
			.await?;
		if result.is_null() {
			return Ok(Vec::new());
		}
		decode::decode_transactions(&result)
	}

	#[instrument(skip(self, ctx))]
	async fn estimate_fee(
		&self,
		ctx: &CallContext,
		tx: &UnsignedTx,
	) -> Result<FeeEstimate, BlockChainError> {
		let tx = serde_json::to_value(tx).map_err(|e| {
			BlockChainError::invalid_params("Failed to encode transaction", Some(Box::new(e)), None)
		})?;
		let result = self.request(ctx, "wes_estimateFee", json!([tx])).await?;
		decode::decode_fee_estimate(&result)
	}

	#[instrument(skip(self, ctx))]
	async fn get_balance(
		&self,
		ctx: &CallContext,
		address: &str,
		anchor: Option<StateAnchor>,
	) -> Result<Balance, BlockChainError> {
		require_non_empty("address", address)?;
		let anchored = anchor.as_ref().and_then(|a| a.height);
		let params = with_anchor(vec![json!(address)], anchor);
		let result = self
			.lookup(ctx, "wes_getBalance", params, || {
				format!("balance of {}", address)
			})
			.await?;
		let mut balance = decode::decode_balance(&result, address)?;
		decode::enforce_height("balance", &mut balance.height, anchored)?;
		Ok(balance)
	}

	#[instrument(skip(self, ctx))]
	async fn get_contract_token_balance(
		&self,
		ctx: &CallContext,
		request: &TokenBalanceRequest,
		anchor: Option<StateAnchor>,
	) -> Result<TokenBalance, BlockChainError> {
		let address = request.address.trim();
		let content_hash = request.content_hash.trim();
		let content_hash = content_hash.strip_prefix("0x").unwrap_or(content_hash);
		require_non_empty("address", address)?;
		require_non_empty("content hash", content_hash)?;

		let mut query = Map::new();
		query.insert("address".to_string(), json!(address));
		query.insert("content_hash".to_string(), json!(content_hash));
		if let Some(token_id) = request.token_id.as_deref().filter(|id| !id.is_empty()) {
			query.insert("token_id".to_string(), json!(token_id));
		}

		let anchored = anchor.as_ref().and_then(|a| a.height);
		let params = with_anchor(vec![Value::Object(query)], anchor);
		let result = self
			.lookup(ctx, "wes_getContractTokenBalance", params, || {
				format!("token balance of {} in {}", address, content_hash)
			})
			.await?;
		let mut balance = decode::decode_token_balance(&result)?;
		decode::enforce_height("token balance", &mut balance.height, anchored)?;
		Ok(balance)
	}

	#[instrument(skip(self, ctx))]
	async fn get_utxos(
		&self,
		ctx: &CallContext,
		address: &str,
		anchor: Option<StateAnchor>,
	) -> Result<Vec<Utxo>, BlockChainError> {
		require_non_empty("address", address)?;
		let params = with_anchor(vec![json!(address)], anchor);
		let result = self.request(ctx, "wes_getUTXO", params).await?;
		if result.is_null() {
			return Ok(Vec::new());
		}
		decode::decode_utxos(&result)
	}

	#[instrument(skip(self, ctx))]
	async fn call(
		&self,
		ctx: &CallContext,
		request: &CallRequest,
		anchor: Option<StateAnchor>,
	) -> Result<CallResult, BlockChainError> {
		require_non_empty("call target", &request.to)?;
		let call = serde_json::to_value(request).map_err(|e| {
			BlockChainError::invalid_params("Failed to encode call request", Some(Box::new(e)), None)
		})?;
		let params = with_anchor(vec![call], anchor);
		let result = self.request(ctx, "wes_call", params).await?;
		decode::decode_call_result(&result)
	}

	#[instrument(skip(self, ctx))]
	async fn txpool_status(&self, ctx: &CallContext) -> Result<TxPoolStatus, BlockChainError> {
		let result = self.request(ctx, "wes_txpool_status", json!([])).await?;
		decode::decode_txpool_status(&result)
	}

	#[instrument(skip(self, ctx))]
	async fn txpool_content(&self, ctx: &CallContext) -> Result<TxPoolContent, BlockChainError> {
		let result = self.request(ctx, "wes_txpool_content", json!([])).await?;
		decode::decode_txpool_content(&result)
	}

	async fn subscribe(
		&self,
		_ctx: &CallContext,
		_event_type: SubscriptionType,
		_filters: Option<Value>,
		_resume_token: Option<String>,
	) -> Result<Subscription, BlockChainError> {
		Err(BlockChainError::unsupported(
			"subscribe",
			JSONRPC_TRANSPORT,
			"use the streaming client for subscriptions",
		))
	}

	#[instrument(skip(self, ctx))]
	async fn get_block_header(
		&self,
		ctx: &CallContext,
		height: u64,
	) -> Result<BlockHeader, BlockChainError> {
		let result = self
			.lookup(ctx, "wes_getBlockHeader", json!([to_hex_u64(height)]), || {
				format!("header at height {}", height)
			})
			.await?;
		decode::decode_block_header(&result)
	}

	#[instrument(skip(self, ctx))]
	async fn get_tx_proof(
		&self,
		ctx: &CallContext,
		tx_hash: &str,
	) -> Result<MerkleProof, BlockChainError> {
		require_non_empty("transaction hash", tx_hash)?;
		let result = self
			.lookup(ctx, "wes_getTxProof", json!([tx_hash]), || {
				format!("proof of {}", tx_hash)
			})
			.await?;
		decode::decode_merkle_proof(&result)
	}

	#[instrument(skip(self, ctx))]
	async fn get_contract(
		&self,
		ctx: &CallContext,
		content_hash: &str,
	) -> Result<ContractMetadata, BlockChainError> {
		require_non_empty("content hash", content_hash)?;
		let result = self
			.lookup(
				ctx,
				"wes_getContract",
				json!([{ "content_hash": content_hash }]),
				|| format!("contract {}", content_hash),
			)
			.await?;
		decode::decode_contract_metadata(&result)?
			.ok_or_else(|| BlockChainError::not_found(format!("contract {}", content_hash)))
	}

	#[instrument(skip(self, ctx))]
	async fn call_raw(
		&self,
		ctx: &CallContext,
		method: &str,
		params: Value,
	) -> Result<Value, BlockChainError> {
		require_non_empty("method", method)?;
		self.request(ctx, method, params).await
	}

	async fn ping(&self, ctx: &CallContext) -> Result<(), BlockChainError> {
		self.chain_id(ctx).await.map(|_| ())
	}

	/// Pooled connections are released when the client is dropped
	async fn close(&self) -> Result<(), BlockChainError> {
		let url = self.transport.get_current_url().await;
		tracing::debug!(url = %url, "Closing JSON-RPC client");
		Ok(())
	}
}

//! REST over HTTP client.
//!
//! A fallback protocol that covers a strict subset of the capability contract. Operations the
//! resource API does not expose fail with [`BlockChainError::Unsupported`] before any I/O.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use serde_json::{json, Value};
use tracing::instrument;
use url::Url;

use crate::{
	models::{
		Balance, Block, BlockHeader, CallRequest, CallResult, ContractMetadata, FeeEstimate,
		MerkleProof, Receipt, SendTxResult, StateAnchor, SubscriptionType, SyncStatus,
		TokenBalance, TokenBalanceRequest, Transaction, TransferRequest, TxHistoryQuery,
		TxPoolContent, TxPoolStatus, UnsignedTx, Utxo,
	},
	services::blockchain::{
		clients::decode, BlockChainClient, BlockChainError, CallContext, Subscription,
	},
	utils::{create_retryable_http_client, HttpRetryConfig},
};

/// Transport name reported in [`BlockChainError::Unsupported`]
pub const REST_TRANSPORT: &str = "rest";

const API_PREFIX: &str = "/api/v1";
const PRIMARY_HINT: &str = "use the primary client for this operation";

/// Appends the API prefix unless the address already ends with it
fn normalize_base_url(url: &str) -> String {
	let trimmed = url.trim_end_matches('/');
	if trimmed.ends_with(API_PREFIX) {
		trimmed.to_string()
	} else {
		format!("{}{}", trimmed, API_PREFIX)
	}
}

fn segment(value: &str) -> String {
	urlencoding::encode(value).into_owned()
}

fn unsupported(operation: &str) -> BlockChainError {
	BlockChainError::unsupported(operation, REST_TRANSPORT, PRIMARY_HINT)
}

/// Client for nodes exposing the resource-oriented HTTP API
#[derive(Debug)]
pub struct RestClient {
	client: ClientWithMiddleware,
	base_url: String,
}

impl RestClient {
	/// Creates a client for the REST API at `url`
	///
	/// # Arguments
	/// * `url` - Node address, with or without the `/api/v1` prefix
	/// * `timeout` - Per-request timeout
	/// * `retry_config` - Transport-level retry policy
	pub fn new(
		url: &str,
		timeout: Duration,
		retry_config: &HttpRetryConfig,
	) -> Result<Self, BlockChainError> {
		let base_url = normalize_base_url(url);
		Url::parse(&base_url).map_err(|e| {
			BlockChainError::config(format!("Invalid address '{}'", url), Some(Box::new(e)))
		})?;

		let base_client = reqwest::ClientBuilder::new()
			.timeout(timeout)
			.build()
			.map_err(|e| {
				BlockChainError::config("Failed to create HTTP client", Some(Box::new(e)))
			})?;

		Ok(Self {
			client: create_retryable_http_client(retry_config, base_client),
			base_url,
		})
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	async fn get(
		&self,
		ctx: &CallContext,
		path: &str,
		query: &[(&'static str, String)],
		resource: &str,
	) -> Result<Value, BlockChainError> {
		let url = format!("{}{}", self.base_url, path);
		let request = self.client.get(url.as_str()).query(query);
		self.execute(ctx, request, path, resource).await
	}

	async fn post(
		&self,
		ctx: &CallContext,
		path: &str,
		body: &Value,
		resource: &str,
	) -> Result<Value, BlockChainError> {
		let url = format!("{}{}", self.base_url, path);
		let request = self.client.post(url.as_str()).json(body);
		self.execute(ctx, request, path, resource).await
	}

	/// Sends the request and decodes the JSON body of a 2xx answer
	///
	/// An empty 2xx body decodes as `null`. A non-2xx answer is mapped by status with the body as
	/// detail.
	async fn execute(
		&self,
		ctx: &CallContext,
		request: RequestBuilder,
		path: &str,
		resource: &str,
	) -> Result<Value, BlockChainError> {
		let metadata = HashMap::from([
			("base_url".to_string(), self.base_url.clone()),
			("path".to_string(), path.to_string()),
		]);

		ctx.run(async {
			let response = request.send().await.map_err(|e| {
				BlockChainError::network(
					"Failed to send request",
					Some(Box::new(e)),
					Some(metadata.clone()),
				)
			})?;

			let status = response.status();
			let bytes = response.bytes().await.map_err(|e| {
				BlockChainError::network(
					"Failed to read response body",
					Some(Box::new(e)),
					Some(metadata.clone()),
				)
			})?;

			if !status.is_success() {
				let body = String::from_utf8_lossy(&bytes).to_string();
				tracing::debug!(path, status = status.as_u16(), "Request failed: {}", body);
				return Err(BlockChainError::from_http_status(
					status.as_u16(),
					resource,
					body,
					Some(metadata.clone()),
				));
			}

			if bytes.iter().all(u8::is_ascii_whitespace) {
				return Ok(Value::Null);
			}
			serde_json::from_slice(&bytes).map_err(|e| {
				BlockChainError::malformed_response(
					"Failed to parse response JSON",
					Some(Box::new(e)),
					Some(metadata.clone()),
				)
			})
		})
		.await
	}
}

/// Reads `member` of an object answer, or the answer itself when it is a bare value
fn member<'a>(value: &'a Value, members: &[&str]) -> &'a Value {
	members
		.iter()
		.find_map(|name| value.get(*name))
		.unwrap_or(value)
}

#[async_trait]
impl BlockChainClient for RestClient {
	#[instrument(skip(self, ctx))]
	async fn chain_id(&self, ctx: &CallContext) -> Result<String, BlockChainError> {
		let info = self.get(ctx, "/chain/info", &[], "chain info").await?;
		decode::decode_chain_id(member(&info, &["chain_id", "chainId"]))
	}

	#[instrument(skip(self, ctx))]
	async fn syncing(&self, ctx: &CallContext) -> Result<SyncStatus, BlockChainError> {
		let status = self.get(ctx, "/chain/syncing", &[], "sync status").await?;
		decode::decode_sync_status(&status)
	}

	#[instrument(skip(self, ctx))]
	async fn block_number(&self, ctx: &CallContext) -> Result<u64, BlockChainError> {
		let head = self.get(ctx, "/chain/head", &[], "chain head").await?;
		decode::decode_height(member(&head, &["height", "blockNumber"]))
	}

	#[instrument(skip(self, ctx))]
	async fn get_block_by_height(
		&self,
		ctx: &CallContext,
		height: u64,
		full_tx: bool,
		anchor: Option<StateAnchor>,
	) -> Result<Block, BlockChainError> {
		let mut query = vec![("full_tx", full_tx.to_string())];
		if let Some(anchor) = &anchor {
			query.extend(anchor.to_query_pairs());
		}
		let resource = format!("block at height {}", height);
		let block = self
			.get(ctx, &format!("/blocks/{}", height), &query, &resource)
			.await?;
		if block.is_null() {
			return Err(BlockChainError::not_found(resource));
		}
		let mut block = decode::decode_block(&block)?;
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
		let resource = format!("block {}", hash);
		let block = self
			.get(
				ctx,
				&format!("/blocks/hash/{}", segment(hash)),
				&[("full_tx", full_tx.to_string())],
				&resource,
			)
			.await?;
		if block.is_null() {
			return Err(BlockChainError::not_found(resource));
		}
		decode::decode_block(&block)
	}

	#[instrument(skip(self, ctx, signed_tx))]
	async fn send_raw_transaction(
		&self,
		ctx: &CallContext,
		signed_tx: &str,
	) -> Result<SendTxResult, BlockChainError> {
		match self
			.post(
				ctx,
				"/transactions",
				&json!({ "signed_tx": signed_tx }),
				"transactions",
			)
			.await
		{
			Ok(result) => decode::decode_send_result(&result),
			Err(BlockChainError::Business { message, .. }) => Ok(SendTxResult::rejected(message)),
			Err(error) => Err(error),
		}
	}

	async fn send_transaction(
		&self,
		_ctx: &CallContext,
		_request: &TransferRequest,
	) -> Result<SendTxResult, BlockChainError> {
		Err(unsupported("send_transaction"))
	}

	#[instrument(skip(self, ctx))]
	async fn get_transaction(
		&self,
		ctx: &CallContext,
		tx_hash: &str,
	) -> Result<Transaction, BlockChainError> {
		let resource = format!("transaction {}", tx_hash);
		let tx = self
			.get(ctx, &format!("/transactions/{}", segment(tx_hash)), &[], &resource)
			.await?;
		if tx.is_null() {
			return Err(BlockChainError::not_found(resource));
		}
		decode::decode_transaction(&tx)
	}

	#[instrument(skip(self, ctx))]
	async fn get_transaction_receipt(
		&self,
		ctx: &CallContext,
		tx_hash: &str,
	) -> Result<Receipt, BlockChainError> {
		let resource = format!("receipt of {}", tx_hash);
		let receipt = self
			.get(
				ctx,
				&format!("/transactions/{}/receipt", segment(tx_hash)),
				&[],
				&resource,
			)
			.await?;
		if receipt.is_null() {
			return Err(BlockChainError::not_found(resource));
		}
		decode::decode_receipt(&receipt)
	}

	async fn get_transaction_history(
		&self,
		_ctx: &CallContext,
		_query: &TxHistoryQuery,
	) -> Result<Vec<Transaction>, BlockChainError> {
		Err(unsupported("get_transaction_history"))
	}

	#[instrument(skip(self, ctx))]
	async fn estimate_fee(
		&self,
		ctx: &CallContext,
		tx: &UnsignedTx,
	) -> Result<FeeEstimate, BlockChainError> {
		let body = serde_json::to_value(tx).map_err(|e| {
			BlockChainError::invalid_params("Failed to encode transaction", Some(Box::new(e)), None)
		})?;
		let estimate = self
			.post(ctx, "/transactions/estimate-fee", &body, "fee estimate")
			.await?;
		decode::decode_fee_estimate(&estimate)
	}

	#[instrument(skip(self, ctx))]
	async fn get_balance(
		&self,
		ctx: &CallContext,
		address: &str,
		anchor: Option<StateAnchor>,
	) -> Result<Balance, BlockChainError> {
		let anchored = anchor.as_ref().and_then(|a| a.height);
		let query = anchor.map(|a| a.to_query_pairs()).unwrap_or_default();
		let resource = format!("balance of {}", address);
		let balance = self
			.get(
				ctx,
				&format!("/accounts/{}/balance", segment(address)),
				&query,
				&resource,
			)
			.await?;
		if balance.is_null() {
			return Err(BlockChainError::not_found(resource));
		}
		let mut balance = decode::decode_balance(&balance, address)?;
		decode::enforce_height("balance", &mut balance.height, anchored)?;
		Ok(balance)
	}

	async fn get_contract_token_balance(
		&self,
		_ctx: &CallContext,
		_request: &TokenBalanceRequest,
		_anchor: Option<StateAnchor>,
	) -> Result<TokenBalance, BlockChainError> {
		Err(unsupported("get_contract_token_balance"))
	}

	#[instrument(skip(self, ctx))]
	async fn get_utxos(
		&self,
		ctx: &CallContext,
		address: &str,
		anchor: Option<StateAnchor>,
	) -> Result<Vec<Utxo>, BlockChainError> {
		let query = anchor.map(|a| a.to_query_pairs()).unwrap_or_default();
		let utxos = self
			.get(
				ctx,
				&format!("/accounts/{}/utxos", segment(address)),
				&query,
				&format!("utxos of {}", address),
			)
			.await?;
		if utxos.is_null() {
			return Ok(Vec::new());
		}
		decode::decode_utxos(&utxos)
	}

	#[instrument(skip(self, ctx))]
	async fn call(
		&self,
		ctx: &CallContext,
		request: &CallRequest,
		anchor: Option<StateAnchor>,
	) -> Result<CallResult, BlockChainError> {
		let mut body = serde_json::to_value(request).map_err(|e| {
			BlockChainError::invalid_params("Failed to encode call request", Some(Box::new(e)), None)
		})?;
		if let (Some(anchor), Some(fields)) = (anchor, body.as_object_mut()) {
			if let Some(height) = anchor.height {
				fields.insert("at_height".to_string(), json!(height));
			}
			if let Some(hash) = anchor.hash {
				fields.insert("at_hash".to_string(), json!(hash));
			}
		}
		let result = self.post(ctx, "/call", &body, "call").await?;
		decode::decode_call_result(&result)
	}

	#[instrument(skip(self, ctx))]
	async fn txpool_status(&self, ctx: &CallContext) -> Result<TxPoolStatus, BlockChainError> {
		let status = self.get(ctx, "/txpool/status", &[], "txpool status").await?;
		decode::decode_txpool_status(&status)
	}

	#[instrument(skip(self, ctx))]
	async fn txpool_content(&self, ctx: &CallContext) -> Result<TxPoolContent, BlockChainError> {
		let content = self
			.get(ctx, "/txpool/content", &[], "txpool content")
			.await?;
		decode::decode_txpool_content(&content)
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
			REST_TRANSPORT,
			"use the streaming client for subscriptions",
		))
	}

	#[instrument(skip(self, ctx))]
	async fn get_block_header(
		&self,
		ctx: &CallContext,
		height: u64,
	) -> Result<BlockHeader, BlockChainError> {
		let resource = format!("header at height {}", height);
		let header = self
			.get(ctx, &format!("/spv/headers/{}", height), &[], &resource)
			.await?;
		if header.is_null() {
			return Err(BlockChainError::not_found(resource));
		}
		decode::decode_block_header(&header)
	}

	#[instrument(skip(self, ctx))]
	async fn get_tx_proof(
		&self,
		ctx: &CallContext,
		tx_hash: &str,
	) -> Result<MerkleProof, BlockChainError> {
		let resource = format!("proof of {}", tx_hash);
		let proof = self
			.get(
				ctx,
				&format!("/spv/tx/{}/proof", segment(tx_hash)),
				&[],
				&resource,
			)
			.await?;
		if proof.is_null() {
			return Err(BlockChainError::not_found(resource));
		}
		decode::decode_merkle_proof(&proof)
	}

	async fn get_contract(
		&self,
		_ctx: &CallContext,
		_content_hash: &str,
	) -> Result<ContractMetadata, BlockChainError> {
		Err(unsupported("get_contract"))
	}

	async fn call_raw(
		&self,
		_ctx: &CallContext,
		_method: &str,
		_params: Value,
	) -> Result<Value, BlockChainError> {
		Err(unsupported("call_raw"))
	}

	async fn ping(&self, ctx: &CallContext) -> Result<(), BlockChainError> {
		self.get(ctx, "/health", &[], "health").await.map(|_| ())
	}

	async fn close(&self) -> Result<(), BlockChainError> {
		tracing::debug!(base_url = %self.base_url, "Closing REST client");
		Ok(())
	}
}

//! Failover client over several endpoints.
//!
//! Routes each operation to the preferred usable endpoint and moves on to the next one when a
//! request fails for reasons another endpoint might not share. A background task probes every
//! endpoint periodically so that recovered endpoints become usable again.

use std::{
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc, Mutex,
	},
	time::Duration,
};

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use tokio::{sync::RwLock, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::{
	models::{
		Balance, Block, BlockHeader, CallRequest, CallResult, ClientConfig, ContractMetadata,
		FeeEstimate, MerkleProof, Receipt, SendTxResult, StateAnchor, SubscriptionType,
		SyncStatus, TokenBalance, TokenBalanceRequest, Transaction, TransferRequest,
		TxHistoryQuery, TxPoolContent, TxPoolStatus, UnsignedTx, Utxo,
	},
	services::blockchain::{
		clients::fallback::health::{
			health_check_loop, EndpointEntry, EndpointHealth, EndpointStatus, Entries,
		},
		factory::create_client,
		BlockChainClient, BlockChainError, CallContext, FailureDisposition, SharedClient,
		Subscription,
	},
	utils::{backoff_delay, HttpRetryConfig},
};

/// Transport name reported in [`BlockChainError::Unsupported`]
pub const FALLBACK_TRANSPORT: &str = "fallback";

/// Picks the endpoint for the next attempt
///
/// The sticky entry is kept while it is usable. Otherwise the first usable entry in priority
/// order wins, and when none is usable the first entry not excluded from this call.
fn select_entry(health: &[EndpointHealth], current: usize, excluded: &[bool]) -> Option<usize> {
	let available = |index: usize| !excluded.get(index).copied().unwrap_or(false);

	if current < health.len() && available(current) && health[current].is_usable() {
		return Some(current);
	}

	(0..health.len())
		.find(|&index| available(index) && health[index].is_usable())
		.or_else(|| (0..health.len()).find(|&index| available(index)))
}

/// Client that spreads operations over prioritized endpoints
pub struct FallbackClient {
	entries: Entries,
	current: AtomicUsize,
	retry_attempts: u32,
	retry_backoff: Duration,
	shutdown: CancellationToken,
	health_task: Mutex<Option<JoinHandle<()>>>,
}

impl FallbackClient {
	/// Builds one client per endpoint and starts the health probe
	///
	/// Endpoints without a primary or secondary address are skipped. Must be called within a
	/// Tokio runtime.
	///
	/// # Arguments
	/// * `config` - Endpoints and failover timing, zero values take their defaults
	pub fn new(config: ClientConfig) -> Result<Self, BlockChainError> {
		let config = config.with_defaults();
		config.validate().map_err(|e| {
			BlockChainError::config("Invalid client configuration", Some(Box::new(e)))
		})?;

		// Failover is handled here, per-request HTTP retries would only delay it.
		let retry_config = HttpRetryConfig::disabled();
		let mut clients = Vec::with_capacity(config.endpoints.len());
		for endpoint in &config.endpoints {
			if !endpoint.has_request_address() {
				tracing::warn!(
					endpoint = %endpoint.name,
					"Skipping endpoint without primary or secondary address"
				);
				continue;
			}
			let client = create_client(endpoint, config.timeout, &retry_config)?;
			clients.push((endpoint.name.clone(), endpoint.priority, client));
		}

		Self::with_clients(clients, &config)
	}

	/// Wraps already built clients given as `(name, priority, client)`
	///
	/// Only the timing fields of `config` are used. Must be called within a Tokio runtime.
	pub fn with_clients(
		clients: Vec<(String, u32, SharedClient)>,
		config: &ClientConfig,
	) -> Result<Self, BlockChainError> {
		if clients.is_empty() {
			return Err(BlockChainError::config(
				"No endpoint can serve requests",
				None,
			));
		}
		let config = config.clone().with_defaults();

		let mut entries: Vec<EndpointEntry> = clients
			.into_iter()
			.map(|(name, priority, client)| EndpointEntry::new(name, priority, client))
			.collect();
		entries.sort_by_key(|entry| entry.priority);

		tracing::info!(
			endpoints = ?entries.iter().map(|entry| entry.name.as_str()).collect::<Vec<_>>(),
			"Failover client ready"
		);

		let entries: Entries = Arc::new(RwLock::new(entries));
		let shutdown = CancellationToken::new();
		let health_task = tokio::spawn(health_check_loop(
			entries.clone(),
			config.health_check_interval,
			shutdown.clone(),
		));

		Ok(Self {
			entries,
			current: AtomicUsize::new(0),
			retry_attempts: config.retry_attempts,
			retry_backoff: config.retry_backoff,
			shutdown,
			health_task: Mutex::new(Some(health_task)),
		})
	}

	/// Health of every endpoint, in priority order
	pub async fn endpoint_statuses(&self) -> Vec<EndpointStatus> {
		self.entries
			.read()
			.await
			.iter()
			.map(EndpointEntry::status)
			.collect()
	}

	/// Name of the endpoint that served the latest attempt
	pub async fn current_endpoint(&self) -> Option<String> {
		let current = self.current.load(Ordering::SeqCst);
		self.entries
			.read()
			.await
			.get(current)
			.map(|entry| entry.name.clone())
	}

	async fn mark_unhealthy(&self, index: usize) {
		if let Some(entry) = self.entries.write().await.get_mut(index) {
			entry.set_health(EndpointHealth::Unhealthy);
		}
	}

	/// Runs `op` against the selected endpoint, failing over as the error dictates
	///
	/// Errors that another endpoint would answer the same way are returned at once. Errors that
	/// say this endpoint cannot serve the operation exclude it for the rest of the call without
	/// consuming an attempt. Any other failure marks the endpoint unhealthy and, unless it was
	/// the last attempt, waits a linearly growing backoff before the next one.
	///
	/// # Arguments
	/// * `ctx` - Caller context, checked before every attempt and honored while waiting
	/// * `operation` - Name used in logs
	/// * `op` - Issues the operation against one client
	pub async fn try_with_fallback<'a, T, F>(
		&'a self,
		ctx: &'a CallContext,
		operation: &str,
		op: F,
	) -> Result<T, BlockChainError>
	where
		T: Send,
		F: Fn(SharedClient) -> BoxFuture<'a, Result<T, BlockChainError>> + Send + Sync,
	{
		let attempts = self.retry_attempts.max(1);
		let mut excluded = vec![false; self.entries.read().await.len()];
		let mut attempt = 0;
		let mut last_error = None;

		while attempt < attempts {
			ctx.check()?;

			let selected = {
				let entries = self.entries.read().await;
				let health: Vec<EndpointHealth> = entries.iter().map(|entry| entry.health).collect();
				select_entry(&health, self.current.load(Ordering::SeqCst), &excluded)
					.map(|index| (index, entries[index].name.clone(), entries[index].client.clone()))
			};
			let Some((index, name, client)) = selected else {
				break;
			};
			self.current.store(index, Ordering::SeqCst);

			let error = match op(client).await {
				Ok(value) => return Ok(value),
				Err(error) => error,
			};

			match error.disposition() {
				FailureDisposition::Propagate => return Err(error),
				FailureDisposition::Redirect => {
					tracing::debug!(
						endpoint = %name,
						operation,
						"Endpoint cannot serve operation: {}",
						error
					);
					if let Some(flag) = excluded.get_mut(index) {
						*flag = true;
					}
				}
				FailureDisposition::Retry => {
					tracing::warn!(
						endpoint = %name,
						operation,
						attempt = attempt + 1,
						attempts,
						"Attempt failed: {}",
						error
					);
					self.mark_unhealthy(index).await;
					if attempt + 1 < attempts {
						ctx.sleep(backoff_delay(self.retry_backoff, attempt)).await?;
					}
					attempt += 1;
				}
			}
			last_error = Some(error);
		}

		match last_error {
			Some(error) if error.disposition() == FailureDisposition::Redirect => Err(error),
			Some(error) => Err(BlockChainError::all_endpoints_failed(attempt, error)),
			None => Err(BlockChainError::config("No endpoint can serve requests", None)),
		}
	}
}

impl Drop for FallbackClient {
	fn drop(&mut self) {
		self.shutdown.cancel();
	}
}

#[async_trait]
impl BlockChainClient for FallbackClient {
	async fn chain_id(&self, ctx: &CallContext) -> Result<String, BlockChainError> {
		self.try_with_fallback(ctx, "chain_id", move |client| {
			Box::pin(async move { client.chain_id(ctx).await })
		})
		.await
	}

	async fn syncing(&self, ctx: &CallContext) -> Result<SyncStatus, BlockChainError> {
		self.try_with_fallback(ctx, "syncing", move |client| {
			Box::pin(async move { client.syncing(ctx).await })
		})
		.await
	}

	async fn block_number(&self, ctx: &CallContext) -> Result<u64, BlockChainError> {
		self.try_with_fallback(ctx, "block_number", move |client| {
			Box::pin(async move { client.block_number(ctx).await })
		})
		.await
	}

	async fn get_block_by_height(
		&self,
		ctx: &CallContext,
		height: u64,
		full_tx: bool,
		anchor: Option<StateAnchor>,
	) -> Result<Block, BlockChainError> {
		let anchor = &anchor;
		self.try_with_fallback(ctx, "get_block_by_height", move |client| {
			let anchor = anchor.clone();
			Box::pin(async move {
				client
					.get_block_by_height(ctx, height, full_tx, anchor)
					.await
			})
		})
		.await
	}

	async fn get_block_by_hash(
		&self,
		ctx: &CallContext,
		hash: &str,
		full_tx: bool,
	) -> Result<Block, BlockChainError> {
		self.try_with_fallback(ctx, "get_block_by_hash", move |client| {
			Box::pin(async move { client.get_block_by_hash(ctx, hash, full_tx).await })
		})
		.await
	}

	async fn send_raw_transaction(
		&self,
		ctx: &CallContext,
		signed_tx: &str,
	) -> Result<SendTxResult, BlockChainError> {
		self.try_with_fallback(ctx, "send_raw_transaction", move |client| {
			Box::pin(async move { client.send_raw_transaction(ctx, signed_tx).await })
		})
		.await
	}

	async fn send_transaction(
		&self,
		ctx: &CallContext,
		request: &TransferRequest,
	) -> Result<SendTxResult, BlockChainError> {
		self.try_with_fallback(ctx, "send_transaction", move |client| {
			Box::pin(async move { client.send_transaction(ctx, request).await })
		})
		.await
	}

	async fn get_transaction(
		&self,
		ctx: &CallContext,
		tx_hash: &str,
	) -> Result<Transaction, BlockChainError> {
		self.try_with_fallback(ctx, "get_transaction", move |client| {
			Box::pin(async move { client.get_transaction(ctx, tx_hash).await })
		})
		.await
	}

	async fn get_transaction_receipt(
		&self,
		ctx: &CallContext,
		tx_hash: &str,
	) -> Result<Receipt, BlockChainError> {
		self.try_with_fallback(ctx, "get_transaction_receipt", move |client| {
			Box::pin(async move { client.get_transaction_receipt(ctx, tx_hash).await })
		})
		.await
	}

	async fn get_transaction_history(
		&self,
		ctx: &CallContext,
		query: &TxHistoryQuery,
	) -> Result<Vec<Transaction>, BlockChainError> {
		self.try_with_fallback(ctx, "get_transaction_history", move |client| {
			Box::pin(async move { client.get_transaction_history(ctx, query).await })
		})
		.await
	}

	async fn estimate_fee(
		&self,
		ctx: &CallContext,
		tx: &UnsignedTx,
	) -> Result<FeeEstimate, BlockChainError> {
		self.try_with_fallback(ctx, "estimate_fee", move |client| {
			Box::pin(async move { client.estimate_fee(ctx, tx).await })
		})
		.await
	}

	async fn get_balance(
		&self,
		ctx: &CallContext,
		address: &str,
		anchor: Option<StateAnchor>,
	) -> Result<Balance, BlockChainError> {
		let anchor = &anchor;
		self.try_with_fallback(ctx, "get_balance", move |client| {
			let anchor = anchor.clone();
			Box::pin(async move { client.get_balance(ctx, address, anchor).await })
		})
		.await
	}

	async fn get_contract_token_balance(
		&self,
		ctx: &CallContext,
		request: &TokenBalanceRequest,
		anchor: Option<StateAnchor>,
	) -> Result<TokenBalance, BlockChainError> {
		let anchor = &anchor;
		self.try_with_fallback(ctx, "get_contract_token_balance", move |client| {
			let anchor = anchor.clone();
			Box::pin(async move {
				client
					.get_contract_token_balance(ctx, request, anchor)
					.await
			})
		})
		.await
	}

	async fn get_utxos(
		&self,
		ctx: &CallContext,
		address: &str,
		anchor: Option<StateAnchor>,
	) -> Result<Vec<Utxo>, BlockChainError> {
		let anchor = &anchor;
		self.try_with_fallback(ctx, "get_utxos", move |client| {
			let anchor = anchor.clone();
			Box::pin(async move { client.get_utxos(ctx, address, anchor).await })
		})
		.await
	}

	async fn call(
		&self,
		ctx: &CallContext,
		request: &CallRequest,
		anchor: Option<StateAnchor>,
	) -> Result<CallResult, BlockChainError> {
		let anchor = &anchor;
		self.try_with_fallback(ctx, "call", move |client| {
			let anchor = anchor.clone();
			Box::pin(async move { client.call(ctx, request, anchor).await })
		})
		.await
	}

	async fn txpool_status(&self, ctx: &CallContext) -> Result<TxPoolStatus, BlockChainError> {
		self.try_with_fallback(ctx, "txpool_status", move |client| {
			Box::pin(async move { client.txpool_status(ctx).await })
		})
		.await
	}

	async fn txpool_content(&self, ctx: &CallContext) -> Result<TxPoolContent, BlockChainError> {
		self.try_with_fallback(ctx, "txpool_content", move |client| {
			Box::pin(async move { client.txpool_content(ctx).await })
		})
		.await
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
			FALLBACK_TRANSPORT,
			"create a streaming client from an endpoint's streaming address",
		))
	}

	async fn get_block_header(
		&self,
		ctx: &CallContext,
		height: u64,
	) -> Result<BlockHeader, BlockChainError> {
		self.try_with_fallback(ctx, "get_block_header", move |client| {
			Box::pin(async move { client.get_block_header(ctx, height).await })
		})
		.await
	}

	async fn get_tx_proof(
		&self,
		ctx: &CallContext,
		tx_hash: &str,
	) -> Result<MerkleProof, BlockChainError> {
		self.try_with_fallback(ctx, "get_tx_proof", move |client| {
			Box::pin(async move { client.get_tx_proof(ctx, tx_hash).await })
		})
		.await
	}

	async fn get_contract(
		&self,
		ctx: &CallContext,
		content_hash: &str,
	) -> Result<ContractMetadata, BlockChainError> {
		self.try_with_fallback(ctx, "get_contract", move |client| {
			Box::pin(async move { client.get_contract(ctx, content_hash).await })
		})
		.await
	}

	async fn call_raw(
		&self,
		ctx: &CallContext,
		method: &str,
		params: Value,
	) -> Result<Value, BlockChainError> {
		let params = &params;
		self.try_with_fallback(ctx, "call_raw", move |client| {
			let params = params.clone();
			Box::pin(async move { client.call_raw(ctx, method, params).await })
		})
		.await
	}

	async fn ping(&self, ctx: &CallContext) -> Result<(), BlockChainError> {
		self.try_with_fallback(ctx, "ping", move |client| {
			Box::pin(async move { client.ping(ctx).await })
		})
		.await
	}

	/// Stops the health probe and closes every client
	///
	/// Every client is closed even when an earlier one fails; the failures are reported
	/// together.
	async fn close(&self) -> Result<(), BlockChainError> {
		self.shutdown.cancel();
		let health_task = self
			.health_task
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.take();
		if let Some(task) = health_task {
			if let Err(e) = task.await {
				tracing::debug!("Health check task ended abnormally: {}", e);
			}
		}

		let clients: Vec<(String, SharedClient)> = self
			.entries
			.read()
			.await
			.iter()
			.map(|entry| (entry.name.clone(), entry.client.clone()))
			.collect();

		let mut errors = Vec::new();
		for (name, client) in clients {
			if let Err(e) = client.close().await {
				tracing::warn!(endpoint = %name, "Failed to close client: {}", e);
				errors.push(e);
			}
		}

		if errors.is_empty() {
			Ok(())
		} else {
			Err(BlockChainError::close(errors))
		}
	}
}

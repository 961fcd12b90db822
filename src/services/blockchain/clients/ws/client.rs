//! WebSocket subscription client.
//!
//! Serves the subscription slice of the capability contract over one persistent connection. A
//! single read loop owns the receiving half and routes frames: responses complete the pending
//! request with the same id, push frames go to the subscription they name. Outgoing frames go
//! through a writer task so that unsubscribing never blocks.

use std::{
	collections::HashMap,
	sync::{
		atomic::{AtomicBool, AtomicU64, Ordering},
		Arc, Mutex, RwLock,
	},
};

use async_trait::async_trait;
use futures_util::{
	stream::{SplitSink, SplitStream},
	SinkExt, StreamExt,
};
use serde_json::{json, Value};
use tokio::{
	net::TcpStream,
	sync::{mpsc, oneshot},
	task::JoinHandle,
};
use tokio_tungstenite::{
	connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use url::Url;

use crate::{
	models::{
		Balance, Block, BlockHeader, CallRequest, CallResult, ContractMetadata, Event,
		FeeEstimate, MerkleProof, Receipt, SendTxResult, StateAnchor, SubscriptionType,
		SyncStatus, TokenBalance, TokenBalanceRequest, Transaction, TransferRequest,
		TxHistoryQuery, TxPoolContent, TxPoolStatus, UnsignedTx, Utxo,
	},
	services::blockchain::{
		classify_rpc_error,
		clients::{
			decode,
			ws::subscription::{Subscription, SubscriptionControl},
		},
		rpc_codes,
		transports::WsConfig,
		BlockChainClient, BlockChainError, CallContext,
	},
};

/// Transport name reported in [`BlockChainError::Unsupported`]
pub const WS_TRANSPORT: &str = "websocket";

const REQUEST_HINT: &str = "use primary or secondary client for this operation";
const PUSH_METHODS: [&str; 2] = ["subscribe_event", "wes_subscription"];

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Queues feeding one [`Subscription`]
struct Slot {
	/// Id of the subscribe request that created the slot
	request_id: u64,
	events: mpsc::Sender<Event>,
	errors: mpsc::Sender<BlockChainError>,
}

/// A subscribe request awaiting its confirmation
enum PendingReply {
	Waiting(oneshot::Sender<Value>),
	/// The caller gave up, a late confirmation is answered with an unsubscribe
	Abandoned,
}

/// State shared by the client, its background tasks and its subscriptions
struct WsShared {
	url: String,
	registry: RwLock<HashMap<String, Slot>>,
	pending: Mutex<HashMap<u64, PendingReply>>,
	outbound: mpsc::UnboundedSender<Message>,
	next_id: AtomicU64,
	connected: AtomicBool,
	shutdown: CancellationToken,
}

impl WsShared {
	fn next_id(&self) -> u64 {
		self.next_id.fetch_add(1, Ordering::Relaxed) + 1
	}

	fn send_frame(&self, frame: &Value) -> Result<(), BlockChainError> {
		self.outbound
			.send(Message::Text(frame.to_string().into()))
			.map_err(|_| {
				BlockChainError::connection_closed(
					"Connection writer has stopped",
					Some(HashMap::from([("url".to_string(), self.url.clone())])),
				)
			})
	}

	fn register(&self, key: String, slot: Slot) {
		self.registry
			.write()
			.unwrap_or_else(|e| e.into_inner())
			.insert(key, slot);
	}

	fn unregister(&self, key: &str) {
		self.registry
			.write()
			.unwrap_or_else(|e| e.into_inner())
			.remove(key);
	}

	/// Detaches a subscribe request its caller no longer waits for
	///
	/// While the request is unanswered its slot is dropped and the request is marked abandoned.
	/// Once answered, the slot already sits under the server's id and is released there.
	fn abandon_subscribe(&self, id: u64) {
		let request_key = id.to_string();
		let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
		if let Some(entry) = pending.get_mut(&id) {
			*entry = PendingReply::Abandoned;
			self.unregister(&request_key);
			return;
		}
		drop(pending);

		let released: Vec<String> = {
			let mut registry = self.registry.write().unwrap_or_else(|e| e.into_inner());
			let keys: Vec<String> = registry
				.iter()
				.filter(|(_, slot)| slot.request_id == id)
				.map(|(key, _)| key.clone())
				.collect();
			for key in &keys {
				registry.remove(key);
			}
			keys
		};
		for key in released.into_iter().filter(|key| *key != request_key) {
			tracing::debug!(url = %self.url, subscription = %key, "Releasing abandoned subscription");
			self.request_unsubscribe(&key);
		}
	}

	/// Routes one decoded text frame
	fn handle_frame(&self, frame: Value) {
		let method = frame.get("method").and_then(Value::as_str);
		if let Some(method) = method.filter(|method| PUSH_METHODS.contains(method)) {
			self.handle_push(method, &frame);
			return;
		}

		let Some(id) = frame.get("id").and_then(Value::as_u64) else {
			tracing::debug!(url = %self.url, "Ignoring frame without id: {}", frame);
			return;
		};

		let server_id = frame.get("result").and_then(subscription_key);
		let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
		match pending.remove(&id) {
			Some(PendingReply::Waiting(reply)) => {
				// A confirmation may carry a server-chosen id. Re-keying happens here, before any
				// later frame is read and under the pending lock, so neither a push for the new id
				// nor an abandoning caller can miss the registration.
				let request_key = id.to_string();
				if let Some(server_id) = server_id.filter(|server_id| *server_id != request_key) {
					let mut registry = self.registry.write().unwrap_or_else(|e| e.into_inner());
					if let Some(slot) = registry.remove(&request_key) {
						registry.insert(server_id, slot);
					}
				}
				drop(pending);
				let _ = reply.send(frame);
			}
			Some(PendingReply::Abandoned) => {
				drop(pending);
				if let Some(server_id) = server_id {
					tracing::debug!(
						url = %self.url,
						subscription = %server_id,
						"Confirmation arrived after the request was abandoned"
					);
					self.request_unsubscribe(&server_id);
				}
			}
			None => tracing::debug!(url = %self.url, id, "Response for unknown request"),
		}
	}

	fn handle_push(&self, method: &str, frame: &Value) {
		let params = frame.get("params");
		let Some(key) = params
			.and_then(|params| params.get("subscription"))
			.and_then(subscription_key)
		else {
			tracing::warn!(url = %self.url, method, "Push frame without subscription id");
			return;
		};

		let registry = self.registry.read().unwrap_or_else(|e| e.into_inner());
		let Some(slot) = registry.get(&key) else {
			tracing::debug!(url = %self.url, subscription = %key, "Event for unknown subscription");
			return;
		};

		let result = params
			.and_then(|params| params.get("result"))
			.unwrap_or(&Value::Null);
		match decode::decode_event(result) {
			Ok(event) => {
				if let Err(e) = slot.events.try_send(event) {
					tracing::warn!(
						url = %self.url,
						subscription = %key,
						"Dropping event: {}",
						e
					);
				}
			}
			Err(error) => {
				if slot.errors.try_send(error).is_err() {
					tracing::warn!(
						url = %self.url,
						subscription = %key,
						"Dropping malformed event notification"
					);
				}
			}
		}
	}

	/// Fails everything still attached to the connection
	///
	/// Pending requests observe a closed reply channel. Every subscription receives one
	/// `ConnectionClosed` error before its queues close.
	fn teardown(&self, reason: &str) {
		if !self.connected.swap(false, Ordering::SeqCst) {
			return;
		}

		self.pending
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.clear();

		let slots: Vec<(String, Slot)> = self
			.registry
			.write()
			.unwrap_or_else(|e| e.into_inner())
			.drain()
			.collect();
		for (id, slot) in slots {
			let metadata = HashMap::from([
				("url".to_string(), self.url.clone()),
				("subscription".to_string(), id),
			]);
			let _ = slot
				.errors
				.try_send(BlockChainError::connection_closed(reason, Some(metadata)));
		}

		self.shutdown.cancel();
		tracing::info!(url = %self.url, "WebSocket connection closed: {}", reason);
	}
}

impl SubscriptionControl for WsShared {
	fn release(&self, id: &str) {
		self.unregister(id);
	}

	fn request_unsubscribe(&self, id: &str) {
		if !self.connected.load(Ordering::SeqCst) {
			return;
		}
		let frame = json!({
			"jsonrpc": "2.0",
			"id": self.next_id(),
			"method": "unsubscribe",
			"params": [id],
		});
		if let Err(e) = self.send_frame(&frame) {
			tracing::debug!(subscription = %id, "Unsubscribe request not sent: {}", e);
		}
	}
}

/// String form of a subscription id, which servers send as a string or a number
fn subscription_key(value: &Value) -> Option<String> {
	match value {
		Value::String(s) if !s.is_empty() => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	}
}

fn subscribe_params(
	event_type: SubscriptionType,
	filters: Option<Value>,
	resume_token: Option<String>,
) -> Value {
	let mut params = vec![json!(event_type.as_str())];
	match (filters, resume_token) {
		(filters, Some(token)) => {
			params.push(filters.unwrap_or_else(|| json!({})));
			params.push(json!(token));
		}
		(Some(filters), None) => params.push(filters),
		(None, None) => {}
	}
	Value::Array(params)
}

async fn read_loop(shared: Arc<WsShared>, mut stream: SplitStream<WsStream>) {
	let reason = loop {
		let frame = tokio::select! {
			biased;
			_ = shared.shutdown.cancelled() => break "client closed",
			frame = stream.next() => frame,
		};

		match frame {
			Some(Ok(Message::Text(text))) => match serde_json::from_str::<Value>(text.as_str()) {
				Ok(frame) => shared.handle_frame(frame),
				Err(e) => tracing::warn!(url = %shared.url, "Ignoring undecodable frame: {}", e),
			},
			Some(Ok(Message::Ping(payload))) => {
				let _ = shared.outbound.send(Message::Pong(payload));
			}
			Some(Ok(Message::Close(_))) | None => break "server closed the connection",
			Some(Ok(_)) => {}
			Some(Err(e)) => {
				tracing::warn!(url = %shared.url, "WebSocket read failed: {}", e);
				break "read error";
			}
		}
	};

	shared.teardown(reason);
}

async fn write_loop(
	shared: Arc<WsShared>,
	mut sink: SplitSink<WsStream, Message>,
	mut outbound: mpsc::UnboundedReceiver<Message>,
) {
	loop {
		let message = tokio::select! {
			biased;
			_ = shared.shutdown.cancelled() => break,
			message = outbound.recv() => message,
		};
		let Some(message) = message else {
			break;
		};
		if let Err(e) = sink.send(message).await {
			tracing::warn!(url = %shared.url, "WebSocket write failed: {}", e);
			shared.teardown("write error");
			break;
		}
	}

	let _ = sink.close().await;
}

/// Client for the streaming endpoint of a node
///
/// Only `subscribe`, `ping` and `close` are served; every other operation is unsupported.
pub struct WsSubscriptionClient {
	shared: Arc<WsShared>,
	config: WsConfig,
	tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl WsSubscriptionClient {
	/// Opens the connection and starts its background tasks
	///
	/// # Arguments
	/// * `url` - `ws://` or `wss://` address
	/// * `config` - Timeouts and queue capacities
	pub async fn connect(url: &str, config: WsConfig) -> Result<Self, BlockChainError> {
		let parsed = Url::parse(url).map_err(|e| {
			BlockChainError::config(format!("Invalid address '{}'", url), Some(Box::new(e)))
		})?;
		if !matches!(parsed.scheme(), "ws" | "wss") {
			return Err(BlockChainError::config(
				format!("Streaming address '{}' must use ws or wss", url),
				None,
			));
		}

		let metadata = HashMap::from([("url".to_string(), url.to_string())]);
		let (stream, _) = tokio::time::timeout(config.connection_timeout, connect_async(url))
			.await
			.map_err(|_| {
				BlockChainError::network(
					format!(
						"Timed out after {:?} connecting to the streaming endpoint",
						config.connection_timeout
					),
					None,
					Some(metadata.clone()),
				)
			})?
			.map_err(|e| {
				BlockChainError::network(
					"Failed to connect to the streaming endpoint",
					Some(Box::new(e)),
					Some(metadata.clone()),
				)
			})?;

		let (sink, stream) = stream.split();
		let (outbound, outbound_rx) = mpsc::unbounded_channel();
		let shared = Arc::new(WsShared {
			url: url.to_string(),
			registry: RwLock::new(HashMap::new()),
			pending: Mutex::new(HashMap::new()),
			outbound,
			next_id: AtomicU64::new(0),
			connected: AtomicBool::new(true),
			shutdown: CancellationToken::new(),
		});

		let tasks = vec![
			tokio::spawn(read_loop(shared.clone(), stream)),
			tokio::spawn(write_loop(shared.clone(), sink, outbound_rx)),
		];

		tracing::info!(url, "Connected to streaming endpoint");
		Ok(Self {
			shared,
			config,
			tasks: Mutex::new(tasks),
		})
	}

	pub fn url(&self) -> &str {
		&self.shared.url
	}

	pub fn is_connected(&self) -> bool {
		self.shared.connected.load(Ordering::SeqCst)
	}

	/// Number of locally registered subscriptions
	pub fn active_subscriptions(&self) -> usize {
		self.shared
			.registry
			.read()
			.unwrap_or_else(|e| e.into_inner())
			.len()
	}

	fn not_connected(&self) -> BlockChainError {
		BlockChainError::connection_closed(
			"Streaming connection is closed",
			Some(HashMap::from([("url".to_string(), self.shared.url.clone())])),
		)
	}

	/// Waits for the answer to request `id`, bounded by the message timeout
	async fn await_reply(
		&self,
		ctx: &CallContext,
		id: u64,
		reply: oneshot::Receiver<Value>,
	) -> Result<Value, BlockChainError> {
		let timeout = self.config.message_timeout;
		ctx.run(async {
			match tokio::time::timeout(timeout, reply).await {
				Ok(Ok(response)) => Ok(response),
				Ok(Err(_)) => Err(self.not_connected()),
				Err(_) => Err(BlockChainError::network(
					format!("No answer to request {} within {:?}", id, timeout),
					None,
					Some(HashMap::from([("url".to_string(), self.shared.url.clone())])),
				)),
			}
		})
		.await
	}

	fn unsupported(operation: &str) -> BlockChainError {
		BlockChainError::unsupported(operation, WS_TRANSPORT, REQUEST_HINT)
	}
}

impl Drop for WsSubscriptionClient {
	fn drop(&mut self) {
		self.shared.shutdown.cancel();
	}
}

#[async_trait]
impl BlockChainClient for WsSubscriptionClient {
	async fn chain_id(&self, _ctx: &CallContext) -> Result<String, BlockChainError> {
		Err(Self::unsupported("chain_id"))
	}

	async fn syncing(&self, _ctx: &CallContext) -> Result<SyncStatus, BlockChainError> {
		Err(Self::unsupported("syncing"))
	}

	async fn block_number(&self, _ctx: &CallContext) -> Result<u64, BlockChainError> {
		Err(Self::unsupported("block_number"))
	}

	async fn get_block_by_height(
		&self,
		_ctx: &CallContext,
		_height: u64,
		_full_tx: bool,
		_anchor: Option<StateAnchor>,
	) -> Result<Block, BlockChainError> {
		Err(Self::unsupported("get_block_by_height"))
	}

	async fn get_block_by_hash(
		&self,
		_ctx: &CallContext,
		_hash: &str,
		_full_tx: bool,
	) -> Result<Block, BlockChainError> {
		Err(Self::unsupported("get_block_by_hash"))
	}

	async fn send_raw_transaction(
		&self,
		_ctx: &CallContext,
		_signed_tx: &str,
	) -> Result<SendTxResult, BlockChainError> {
		Err(Self::unsupported("send_raw_transaction"))
	}

	async fn send_transaction(
		&self,
		_ctx: &CallContext,
		_request: &TransferRequest,
	) -> Result<SendTxResult, BlockChainError> {
		Err(Self::unsupported("send_transaction"))
	}

	async fn get_transaction(
		&self,
		_ctx: &CallContext,
		_tx_hash: &str,
	) -> Result<Transaction, BlockChainError> {
		Err(Self::unsupported("get_transaction"))
	}

	async fn get_transaction_receipt(
		&self,
		_ctx: &CallContext,
		_tx_hash: &str,
	) -> Result<Receipt, BlockChainError> {
		Err(Self::unsupported("get_transaction_receipt"))
	}

	async fn get_transaction_history(
		&self,
		_ctx: &CallContext,
		_query: &TxHistoryQuery,
	) -> Result<Vec<Transaction>, BlockChainError> {
		Err(Self::unsupported("get_transaction_history"))
	}

	async fn estimate_fee(
		&self,
		_ctx: &CallContext,
		_tx: &UnsignedTx,
	) -> Result<FeeEstimate, BlockChainError> {
		Err(Self::unsupported("estimate_fee"))
	}

	async fn get_balance(
		&self,
		_ctx: &CallContext,
		_address: &str,
		_anchor: Option<StateAnchor>,
	) -> Result<Balance, BlockChainError> {
		Err(Self::unsupported("get_balance"))
	}

	async fn get_contract_token_balance(
		&self,
		_ctx: &CallContext,
		_request: &TokenBalanceRequest,
		_anchor: Option<StateAnchor>,
	) -> Result<TokenBalance, BlockChainError> {
		Err(Self::unsupported("get_contract_token_balance"))
	}

	async fn get_utxos(
		&self,
		_ctx: &CallContext,
		_address: &str,
		_anchor: Option<StateAnchor>,
	) -> Result<Vec<Utxo>, BlockChainError> {
		Err(Self::unsupported("get_utxos"))
	}

	async fn call(
		&self,
		_ctx: &CallContext,
		_request: &CallRequest,
		_anchor: Option<StateAnchor>,
	) -> Result<CallResult, BlockChainError> {
		Err(Self::unsupported("call"))
	}

	async fn txpool_status(&self, _ctx: &CallContext) -> Result<TxPoolStatus, BlockChainError> {
		Err(Self::unsupported("txpool_status"))
	}

	async fn txpool_content(&self, _ctx: &CallContext) -> Result<TxPoolContent, BlockChainError> {
		Err(Self::unsupported("txpool_content"))
	}

	#[instrument(skip(self, ctx, filters))]
	async fn subscribe(
		&self,
		ctx: &CallContext,
		event_type: SubscriptionType,
		filters: Option<Value>,
		resume_token: Option<String>,
	) -> Result<Subscription, BlockChainError> {
		ctx.check()?;
		if !self.is_connected() {
			return Err(self.not_connected());
		}

		let shared = &self.shared;
		let id = shared.next_id();
		let key = id.to_string();
		let (event_tx, event_rx) = mpsc::channel(self.config.event_queue_capacity);
		let (error_tx, error_rx) = mpsc::channel(self.config.error_queue_capacity);
		let (reply_tx, reply_rx) = oneshot::channel();

		shared.register(
			key.clone(),
			Slot {
				request_id: id,
				events: event_tx,
				errors: error_tx,
			},
		);
		shared
			.pending
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.insert(id, PendingReply::Waiting(reply_tx));

		let frame = json!({
			"jsonrpc": "2.0",
			"id": id,
			"method": "subscribe",
			"params": subscribe_params(event_type, filters, resume_token),
		});

		let response = match shared.send_frame(&frame) {
			Ok(()) => self.await_reply(ctx, id, reply_rx).await,
			Err(e) => Err(e),
		};
		let response = match response {
			Ok(response) => response,
			Err(e) => {
				shared.abandon_subscribe(id);
				return Err(e);
			}
		};

		if let Some(error) = response.get("error").filter(|error| !error.is_null()) {
			shared.unregister(&key);
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
				"subscribe",
			));
		}

		let Some(subscription_id) = response.get("result").and_then(subscription_key) else {
			shared.unregister(&key);
			return Err(BlockChainError::malformed_response(
				"Subscription confirmation carries no subscription id",
				None,
				Some(HashMap::from([("url".to_string(), shared.url.clone())])),
			));
		};

		tracing::debug!(url = %shared.url, subscription = %subscription_id, "Subscribed");
		let control: Arc<dyn SubscriptionControl> = self.shared.clone();
		Ok(Subscription::new(
			subscription_id,
			event_type,
			event_rx,
			error_rx,
			control,
		))
	}

	async fn get_block_header(
		&self,
		_ctx: &CallContext,
		_height: u64,
	) -> Result<BlockHeader, BlockChainError> {
		Err(Self::unsupported("get_block_header"))
	}

	async fn get_tx_proof(
		&self,
		_ctx: &CallContext,
		_tx_hash: &str,
	) -> Result<MerkleProof, BlockChainError> {
		Err(Self::unsupported("get_tx_proof"))
	}

	async fn get_contract(
		&self,
		_ctx: &CallContext,
		_content_hash: &str,
	) -> Result<ContractMetadata, BlockChainError> {
		Err(Self::unsupported("get_contract"))
	}

	async fn call_raw(
		&self,
		_ctx: &CallContext,
		_method: &str,
		_params: Value,
	) -> Result<Value, BlockChainError> {
		Err(Self::unsupported("call_raw"))
	}

	/// Reports whether the connection is still open
	async fn ping(&self, ctx: &CallContext) -> Result<(), BlockChainError> {
		ctx.check()?;
		if self.is_connected() {
			Ok(())
		} else {
			Err(self.not_connected())
		}
	}

	async fn close(&self) -> Result<(), BlockChainError> {
		self.shared.teardown("client closed");
		self.shared.shutdown.cancel();

		let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(|e| e.into_inner()));
		for task in tasks {
			if let Err(e) = task.await {
				tracing::debug!(url = %self.shared.url, "Connection task ended abnormally: {}", e);
			}
		}
		Ok(())
	}
}

//! Core blockchain client interface.
//!
//! This module defines the capability contract shared by every protocol client and by the
//! failover orchestrator, so that callers issue the same operations regardless of which
//! transport answers them.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
	models::{
		Balance, Block, BlockHeader, CallRequest, CallResult, ContractMetadata, FeeEstimate,
		MerkleProof, Receipt, SendTxResult, StateAnchor, SubscriptionType, SyncStatus,
		TokenBalance, TokenBalanceRequest, Transaction, TransferRequest, TxHistoryQuery,
		TxPoolContent, TxPoolStatus, UnsignedTx, Utxo,
	},
	services::blockchain::{BlockChainError, CallContext, Subscription},
};

/// Shared handle to any client implementation
pub type SharedClient = Arc<dyn BlockChainClient>;

/// Defines the operations a remote node offers to its clients
///
/// Every operation takes a [`CallContext`] and stops when it is cancelled or past its deadline.
/// A client that cannot serve an operation over its transport fails with
/// [`BlockChainError::Unsupported`] without any I/O. Lookups that find nothing fail with
/// [`BlockChainError::NotFound`].
///
/// State queries accept an optional [`StateAnchor`] that is forwarded to the node unchanged:
/// the same anchor against an unchanged chain observes the same state. `None` reads the latest
/// state.
///
/// Submission operations never accept private key material.
#[async_trait]
pub trait BlockChainClient: Send + Sync {
	/// Identifier of the chain the node serves
	async fn chain_id(&self, ctx: &CallContext) -> Result<String, BlockChainError>;

	async fn syncing(&self, ctx: &CallContext) -> Result<SyncStatus, BlockChainError>;

	/// Height of the node's current head
	async fn block_number(&self, ctx: &CallContext) -> Result<u64, BlockChainError>;

	/// Retrieves a block by height
	///
	/// # Arguments
	/// * `height` - Block height
	/// * `full_tx` - Whether to include full transactions instead of hashes
	/// * `anchor` - Optional state anchor
	async fn get_block_by_height(
		&self,
		ctx: &CallContext,
		height: u64,
		full_tx: bool,
		anchor: Option<StateAnchor>,
	) -> Result<Block, BlockChainError>;

	async fn get_block_by_hash(
		&self,
		ctx: &CallContext,
		hash: &str,
		full_tx: bool,
	) -> Result<Block, BlockChainError>;

	/// Submits a transaction signed by the caller
	///
	/// A rejection by the node's rules is returned as `Ok` with `accepted == false` and the
	/// node's reason. Transport failures are errors.
	async fn send_raw_transaction(
		&self,
		ctx: &CallContext,
		signed_tx: &str,
	) -> Result<SendTxResult, BlockChainError>;

	/// Asks the node to build, sign and submit a transfer with a key it manages
	async fn send_transaction(
		&self,
		ctx: &CallContext,
		request: &TransferRequest,
	) -> Result<SendTxResult, BlockChainError>;

	async fn get_transaction(
		&self,
		ctx: &CallContext,
		tx_hash: &str,
	) -> Result<Transaction, BlockChainError>;

	async fn get_transaction_receipt(
		&self,
		ctx: &CallContext,
		tx_hash: &str,
	) -> Result<Receipt, BlockChainError>;

	/// Transactions touching a transaction id or a resource, paginated
	async fn get_transaction_history(
		&self,
		ctx: &CallContext,
		query: &TxHistoryQuery,
	) -> Result<Vec<Transaction>, BlockChainError>;

	async fn estimate_fee(
		&self,
		ctx: &CallContext,
		tx: &UnsignedTx,
	) -> Result<FeeEstimate, BlockChainError>;

	async fn get_balance(
		&self,
		ctx: &CallContext,
		address: &str,
		anchor: Option<StateAnchor>,
	) -> Result<Balance, BlockChainError>;

	async fn get_contract_token_balance(
		&self,
		ctx: &CallContext,
		request: &TokenBalanceRequest,
		anchor: Option<StateAnchor>,
	) -> Result<TokenBalance, BlockChainError>;

	async fn get_utxos(
		&self,
		ctx: &CallContext,
		address: &str,
		anchor: Option<StateAnchor>,
	) -> Result<Vec<Utxo>, BlockChainError>;

	/// Read-only contract call
	async fn call(
		&self,
		ctx: &CallContext,
		request: &CallRequest,
		anchor: Option<StateAnchor>,
	) -> Result<CallResult, BlockChainError>;

	async fn txpool_status(&self, ctx: &CallContext) -> Result<TxPoolStatus, BlockChainError>;

	async fn txpool_content(&self, ctx: &CallContext) -> Result<TxPoolContent, BlockChainError>;

	/// Opens a subscription to an event stream
	///
	/// # Arguments
	/// * `event_type` - Stream to attach to
	/// * `filters` - Optional stream specific filters, forwarded as is
	/// * `resume_token` - Cursor of the last processed event, to resume without gaps
	async fn subscribe(
		&self,
		ctx: &CallContext,
		event_type: SubscriptionType,
		filters: Option<Value>,
		resume_token: Option<String>,
	) -> Result<Subscription, BlockChainError>;

	async fn get_block_header(
		&self,
		ctx: &CallContext,
		height: u64,
	) -> Result<BlockHeader, BlockChainError>;

	/// Merkle proof of inclusion of a transaction in its block
	async fn get_tx_proof(
		&self,
		ctx: &CallContext,
		tx_hash: &str,
	) -> Result<MerkleProof, BlockChainError>;

	async fn get_contract(
		&self,
		ctx: &CallContext,
		content_hash: &str,
	) -> Result<ContractMetadata, BlockChainError>;

	/// Invokes an arbitrary remote method and returns its raw result
	async fn call_raw(
		&self,
		ctx: &CallContext,
		method: &str,
		params: Value,
	) -> Result<Value, BlockChainError>;

	/// Cheap liveness probe
	async fn ping(&self, ctx: &CallContext) -> Result<(), BlockChainError>;

	/// Releases the client's resources
	async fn close(&self) -> Result<(), BlockChainError>;
}

//! Mock implementation of the blockchain client trait.
//!
//! [`MockBlockChainClient`] lets failover tests script each endpoint's answers without any
//! network connection.

use async_trait::async_trait;
use mockall::mock;
use serde_json::Value;

use chain_access::{
	models::{
		Balance, Block, BlockHeader, CallRequest, CallResult, ContractMetadata, FeeEstimate,
		MerkleProof, Receipt, SendTxResult, StateAnchor, SubscriptionType, SyncStatus,
		TokenBalance, TokenBalanceRequest, Transaction, TransferRequest, TxHistoryQuery,
		TxPoolContent, TxPoolStatus, UnsignedTx, Utxo,
	},
	services::blockchain::{BlockChainClient, BlockChainError, CallContext, Subscription},
};

mock! {
	pub BlockChainClient {}

	#[async_trait]
	impl BlockChainClient for BlockChainClient {
		async fn chain_id(&self, ctx: &CallContext) -> Result<String, BlockChainError>;
		async fn syncing(&self, ctx: &CallContext) -> Result<SyncStatus, BlockChainError>;
		async fn block_number(&self, ctx: &CallContext) -> Result<u64, BlockChainError>;
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
		async fn send_raw_transaction(
			&self,
			ctx: &CallContext,
			signed_tx: &str,
		) -> Result<SendTxResult, BlockChainError>;
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
		async fn call(
			&self,
			ctx: &CallContext,
			request: &CallRequest,
			anchor: Option<StateAnchor>,
		) -> Result<CallResult, BlockChainError>;
		async fn txpool_status(&self, ctx: &CallContext) -> Result<TxPoolStatus, BlockChainError>;
		async fn txpool_content(&self, ctx: &CallContext) -> Result<TxPoolContent, BlockChainError>;
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
		async fn call_raw(
			&self,
			ctx: &CallContext,
			method: &str,
			params: Value,
		) -> Result<Value, BlockChainError>;
		async fn ping(&self, ctx: &CallContext) -> Result<(), BlockChainError>;
		async fn close(&self) -> Result<(), BlockChainError>;
	}
}

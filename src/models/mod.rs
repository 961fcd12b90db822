//! Domain models and data structures.
//!
//! - `blockchain`: read-model types returned by queries and subscriptions
//! - `config`: configuration loading and validation
//! - `core`: endpoints, client configuration and state anchors

mod blockchain;
mod config;
mod core;

pub use blockchain::{
	AssetOutput, Balance, Block, BlockHeader, CallRequest, CallResult, ContractMetadata,
	ContractTokenAsset, Event, FeeEstimate, Log, MerkleProof, OutPoint, OutputPayload, Receipt,
	ResourceOutput, SendTxResult, StateOutput, SubscriptionType, SyncStatus, TokenBalance,
	TokenBalanceRequest, Transaction, TransferRequest, TxHistoryQuery, TxInput, TxOutput,
	TxPoolContent, TxPoolStatus, UnlockingProofType, UnsignedTx, Utxo, DEFAULT_HISTORY_LIMIT,
};

pub use config::{ConfigError, ConfigLoader};

pub use core::{
	ClientConfig, Endpoint, StateAnchor, DEFAULT_HEALTH_CHECK_INTERVAL, DEFAULT_RETRY_ATTEMPTS,
	DEFAULT_RETRY_BACKOFF, DEFAULT_TIMEOUT,
};

//! Read-model types returned by the access layer.
//!
//! Plain data contracts without behavior. Numeric fields hold canonical values: heights and
//! nonces as `u64`, amounts as decimal strings, timestamps as unix seconds.

mod block;
mod chain;
mod event;
mod state;
mod transaction;

pub use block::{Block, BlockHeader};
pub use chain::{MerkleProof, SyncStatus, TxPoolContent, TxPoolStatus};
pub use event::{Event, SubscriptionType};
pub use state::{
	Balance, CallRequest, CallResult, ContractMetadata, TokenBalance, TokenBalanceRequest, Utxo,
};
pub use transaction::{
	AssetOutput, ContractTokenAsset, FeeEstimate, Log, OutPoint, OutputPayload, Receipt,
	ResourceOutput, SendTxResult, StateOutput, Transaction, TransferRequest, TxHistoryQuery,
	TxInput, TxOutput, UnlockingProofType, UnsignedTx, DEFAULT_HISTORY_LIMIT,
};

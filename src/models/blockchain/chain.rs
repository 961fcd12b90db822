use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Transaction;

/// Node synchronisation progress
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
	pub syncing: bool,
	pub starting_block: u64,
	pub current_block: u64,
	pub highest_block: u64,
}

/// Mempool counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPoolStatus {
	pub pending: u64,
	pub queued: u64,
	pub total: u64,
}

/// Mempool content grouped by sender address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPoolContent {
	pub pending: BTreeMap<String, Vec<Transaction>>,
	pub queued: BTreeMap<String, Vec<Transaction>>,
}

/// Merkle inclusion proof of a transaction in a block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
	pub tx_hash: String,
	pub block_hash: String,
	pub block_height: u64,
	pub tx_index: u32,
	pub siblings: Vec<String>,
	pub root: String,
}

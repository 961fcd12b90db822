use serde::{Deserialize, Serialize};

use super::Transaction;

/// Block as returned by block queries
///
/// `transactions` is populated when the query asked for full transactions, `tx_hashes`
/// otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
	pub height: u64,
	pub hash: String,
	pub parent_hash: String,
	/// Unix seconds
	pub timestamp: u64,
	pub tx_count: u64,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub transactions: Vec<Transaction>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub tx_hashes: Vec<String>,
	pub state_root: String,
	pub miner: String,
	pub difficulty: String,
}

/// Light-client block header
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
	pub height: u64,
	pub hash: String,
	pub parent_hash: String,
	/// Unix seconds
	pub timestamp: u64,
	pub state_root: String,
	pub tx_root: String,
	pub difficulty: String,
	pub nonce: String,
}

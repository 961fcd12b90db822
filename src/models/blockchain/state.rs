use serde::{Deserialize, Serialize};

/// Account balance at a point in chain history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
	pub address: String,
	/// Decimal amount
	pub balance: String,
	pub height: u64,
	pub hash: String,
	pub state_root: String,
	/// Unix seconds
	pub timestamp: u64,
}

/// Query for a contract token balance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalanceRequest {
	pub address: String,
	pub content_hash: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub token_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
	pub address: String,
	pub content_hash: String,
	pub contract_address: String,
	pub token_id: String,
	/// Decimal amount
	pub balance: String,
	pub height: u64,
	pub hash: String,
	pub state_root: String,
	/// Unix seconds
	pub timestamp: u64,
	pub utxo_count: u64,
}

/// Unspent transaction output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
	/// Hash of the creating transaction, without `0x` prefix
	pub tx_hash: String,
	pub output_index: u32,
	/// Decimal amount
	pub amount: String,
	pub address: String,
	pub lock_script: String,
	pub confirmations: u64,
}

/// Read-only contract call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub from: String,
	pub to: String,
	pub data: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResult {
	pub output: String,
	pub gas_used: String,
	pub success: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

/// Metadata of a deployed contract resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractMetadata {
	pub content_hash: String,
	pub name: String,
	pub version: String,
	pub abi_version: String,
	pub exported_functions: Vec<String>,
	pub description: String,
	pub size: u64,
	pub mime_type: String,
	/// Unix seconds
	pub creation_time: u64,
	pub owner: String,
}

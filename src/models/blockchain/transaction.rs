use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default page size of transaction history queries
pub const DEFAULT_HISTORY_LIMIT: u32 = 10;

/// Transaction as returned by transaction and block queries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
	pub tx_hash: String,
	pub version: u32,
	pub nonce: u64,
	/// Unix seconds
	pub timestamp: u64,
	pub chain_id: String,
	/// pending, confirmed or failed
	pub status: String,
	pub block_hash: String,
	pub block_height: u64,
	pub tx_index: u32,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub inputs: Vec<TxInput>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub outputs: Vec<TxOutput>,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub from: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub to: String,
	/// Decimal amount
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub value: String,
	/// Decimal amount
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub fee: String,
}

/// Reference to an output of an earlier transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutPoint {
	pub tx_id: String,
	pub output_index: u32,
}

/// Kind of proof unlocking a transaction input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockingProofType {
	SingleKey,
	MultiKey,
	Execution,
	Delegation,
	Threshold,
	TimeLock,
	HeightLock,
	#[default]
	Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
	pub previous_output: Option<OutPoint>,
	pub is_reference_only: bool,
	pub sequence: u32,
	pub unlocking_proof_type: UnlockingProofType,
}

/// Transaction output: an owner, its locking conditions and a typed payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
	pub owner: String,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub locking_conditions: Vec<Value>,
	pub payload: OutputPayload,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
pub enum OutputPayload {
	Asset(AssetOutput),
	Resource(ResourceOutput),
	State(StateOutput),
	#[default]
	Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetOutput {
	/// Decimal amount of native coin
	pub native_amount: Option<String>,
	pub contract_token: Option<ContractTokenAsset>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractTokenAsset {
	pub contract_address: String,
	/// Decimal amount
	pub amount: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceOutput {
	pub content_hash: String,
	pub category: String,
	pub executable_type: String,
	pub mime_type: String,
	pub size: u64,
	pub creation_timestamp: u64,
	pub is_immutable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateOutput {
	pub state_id: String,
	pub state_version: u64,
	pub execution_result_hash: String,
	pub parent_state_hash: String,
}

/// Execution receipt of a transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
	pub tx_hash: String,
	pub block_hash: String,
	pub block_height: u64,
	/// success or failed
	pub status: String,
	pub gas_used: String,
	pub logs: Vec<Log>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
	pub address: String,
	pub topics: Vec<String>,
	pub data: String,
}

/// Outcome of a submission
///
/// `accepted == false` together with a `reason` is a business rejection reported by the node,
/// not a transport failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendTxResult {
	pub tx_hash: String,
	pub accepted: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
}

impl SendTxResult {
	pub fn accepted(tx_hash: impl Into<String>) -> Self {
		Self {
			tx_hash: tx_hash.into(),
			accepted: true,
			reason: None,
		}
	}

	pub fn rejected(reason: impl Into<String>) -> Self {
		Self {
			tx_hash: String::new(),
			accepted: false,
			reason: Some(reason.into()),
		}
	}
}

/// Unsigned transaction description used for fee estimation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTx {
	pub from: String,
	pub to: String,
	pub value: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub data: String,
	pub nonce: u64,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimate {
	pub base_fee: String,
	pub priority_fee: String,
	pub total_fee: String,
	pub gas_limit: u64,
	pub suggested_tip: String,
}

/// Transfer built and signed by the node itself, for trusted local callers
///
/// Carries no key material: the node signs with a key it manages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
	pub from: String,
	pub to: String,
	/// Decimal amount
	pub amount: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fee: Option<String>,
}

/// Filters of a transaction history query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHistoryQuery {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tx_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub resource_id: Option<String>,
	pub limit: u32,
	pub offset: u32,
}

impl Default for TxHistoryQuery {
	fn default() -> Self {
		Self {
			tx_id: None,
			resource_id: None,
			limit: DEFAULT_HISTORY_LIMIT,
			offset: 0,
		}
	}
}

impl TxHistoryQuery {
	pub fn for_transaction(tx_id: impl Into<String>) -> Self {
		Self {
			tx_id: Some(tx_id.into()),
			..Self::default()
		}
	}

	pub fn for_resource(resource_id: impl Into<String>) -> Self {
		Self {
			resource_id: Some(resource_id.into()),
			..Self::default()
		}
	}

	pub fn with_page(mut self, limit: u32, offset: u32) -> Self {
		self.limit = limit;
		self.offset = offset;
		self
	}
}

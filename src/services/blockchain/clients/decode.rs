//! Tolerant decoding of node responses into read-models.
//!
//! Nodes disagree on field spelling (`parent_hash` vs `parentHash`) and on numeric encoding
//! (number, decimal string, hex string). Decoders look fields up under every known alias and
//! parse numbers through [`crate::utils::parsing`]. Missing fields decode to defaults, present
//! but unparseable numeric fields fail with [`BlockChainError::MalformedResponse`].

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};

use crate::{
	models::{
		AssetOutput, Balance, Block, BlockHeader, CallResult, ContractMetadata,
		ContractTokenAsset, Event, FeeEstimate, Log, MerkleProof, OutPoint, OutputPayload,
		Receipt, ResourceOutput, SendTxResult, StateOutput, SyncStatus, TokenBalance, Transaction,
		TxInput, TxOutput, TxPoolContent, TxPoolStatus, UnlockingProofType, Utxo,
	},
	services::blockchain::BlockChainError,
	utils::parsing::{parse_amount, parse_outpoint, parse_timestamp, parse_u64},
};

/// Proof keys of a transaction input, in detection order
const PROOF_KEYS: [(&str, UnlockingProofType); 7] = [
	("single_key_proof", UnlockingProofType::SingleKey),
	("multi_key_proof", UnlockingProofType::MultiKey),
	("execution_proof", UnlockingProofType::Execution),
	("delegation_proof", UnlockingProofType::Delegation),
	("threshold_proof", UnlockingProofType::Threshold),
	("time_proof", UnlockingProofType::TimeLock),
	("height_proof", UnlockingProofType::HeightLock),
];

fn malformed(what: &str, message: impl std::fmt::Display) -> BlockChainError {
	BlockChainError::malformed_response(
		format!("Invalid {}: {}", what, message),
		None,
		Some(HashMap::from([("model".to_string(), what.to_string())])),
	)
}

/// Field accessor over a JSON object
struct Fields<'a> {
	map: &'a Map<String, Value>,
	what: &'static str,
}

impl<'a> Fields<'a> {
	fn new(value: &'a Value, what: &'static str) -> Result<Self, BlockChainError> {
		value
			.as_object()
			.map(|map| Self { map, what })
			.ok_or_else(|| malformed(what, format!("expected an object, got {}", value)))
	}

	/// First non-null value among `keys`
	fn get(&self, keys: &[&str]) -> Option<&'a Value> {
		keys.iter()
			.filter_map(|key| self.map.get(*key))
			.find(|value| !value.is_null())
	}

	fn string(&self, keys: &[&str]) -> String {
		match self.get(keys) {
			Some(Value::String(s)) => s.clone(),
			Some(Value::Number(n)) => n.to_string(),
			Some(Value::Bool(b)) => b.to_string(),
			_ => String::new(),
		}
	}

	fn u64(&self, keys: &[&str]) -> Result<u64, BlockChainError> {
		self.get(keys)
			.map(|value| parse_u64(value).map_err(|e| malformed(self.what, format!("{} ({})", e, keys[0]))))
			.transpose()
			.map(Option::unwrap_or_default)
	}

	fn u32(&self, keys: &[&str]) -> Result<u32, BlockChainError> {
		let value = self.u64(keys)?;
		u32::try_from(value)
			.map_err(|_| malformed(self.what, format!("{} out of range ({})", value, keys[0])))
	}

	fn amount(&self, keys: &[&str]) -> Result<Option<String>, BlockChainError> {
		self.get(keys)
			.map(|value| parse_amount(value).map_err(|e| malformed(self.what, format!("{} ({})", e, keys[0]))))
			.transpose()
	}

	fn timestamp(&self, keys: &[&str]) -> Result<u64, BlockChainError> {
		self.get(keys)
			.map(|value| {
				parse_timestamp(value).map_err(|e| malformed(self.what, format!("{} ({})", e, keys[0])))
			})
			.transpose()
			.map(Option::unwrap_or_default)
	}

	fn bool(&self, keys: &[&str]) -> bool {
		match self.get(keys) {
			Some(Value::Bool(b)) => *b,
			Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
			_ => false,
		}
	}

	fn strings(&self, keys: &[&str]) -> Vec<String> {
		self.get(keys)
			.and_then(Value::as_array)
			.map(|items| {
				items
					.iter()
					.filter_map(|item| item.as_str().map(str::to_string))
					.collect()
			})
			.unwrap_or_default()
	}

	fn object(&self, keys: &[&str]) -> Option<Fields<'a>> {
		self.get(keys)
			.and_then(Value::as_object)
			.map(|map| Fields {
				map,
				what: self.what,
			})
	}

	fn array(&self, keys: &[&str]) -> &'a [Value] {
		self.get(keys)
			.and_then(Value::as_array)
			.map(Vec::as_slice)
			.unwrap_or_default()
	}
}

pub fn decode_chain_id(value: &Value) -> Result<String, BlockChainError> {
	match value {
		Value::String(s) => Ok(s.clone()),
		Value::Number(n) => Ok(n.to_string()),
		other => Err(malformed("chain id", format!("expected a string, got {}", other))),
	}
}

pub fn decode_height(value: &Value) -> Result<u64, BlockChainError> {
	parse_u64(value).map_err(|e| malformed("block number", e))
}

/// `false` means the node is not syncing, an object carries its progress
pub fn decode_sync_status(value: &Value) -> Result<SyncStatus, BlockChainError> {
	if let Value::Bool(syncing) = value {
		return Ok(SyncStatus {
			syncing: *syncing,
			..SyncStatus::default()
		});
	}

	let fields = Fields::new(value, "sync status")?;
	Ok(SyncStatus {
		syncing: fields
			.get(&["syncing"])
			.map(|_| fields.bool(&["syncing"]))
			.unwrap_or(true),
		starting_block: fields.u64(&["starting_block", "startingBlock"])?,
		current_block: fields.u64(&["current_block", "currentBlock"])?,
		highest_block: fields.u64(&["highest_block", "highestBlock"])?,
	})
}

pub fn decode_block(value: &Value) -> Result<Block, BlockChainError> {
	let fields = Fields::new(value, "block")?;

	let mut transactions = Vec::new();
	let mut tx_hashes = fields.strings(&["tx_hashes", "txHashes"]);
	for item in fields.array(&["transactions"]) {
		match item {
			Value::String(hash) => tx_hashes.push(hash.clone()),
			other => transactions.push(decode_transaction(other)?),
		}
	}

	let listed = (transactions.len() + tx_hashes.len()) as u64;
	let tx_count = match fields.get(&["tx_count", "txCount"]) {
		Some(_) => fields.u64(&["tx_count", "txCount"])?,
		None => listed,
	};

	Ok(Block {
		height: fields.u64(&["height", "number", "block_height", "blockHeight"])?,
		hash: fields.string(&["hash", "block_hash", "blockHash"]),
		parent_hash: fields.string(&["parent_hash", "parentHash"]),
		timestamp: fields.timestamp(&["timestamp"])?,
		tx_count,
		transactions,
		tx_hashes,
		state_root: fields.string(&["state_root", "stateRoot"]),
		miner: fields.string(&["miner"]),
		difficulty: fields.string(&["difficulty"]),
	})
}

pub fn decode_block_header(value: &Value) -> Result<BlockHeader, BlockChainError> {
	let fields = Fields::new(value, "block header")?;
	Ok(BlockHeader {
		height: fields.u64(&["height", "number", "block_height", "blockHeight"])?,
		hash: fields.string(&["hash", "block_hash", "blockHash"]),
		parent_hash: fields.string(&["parent_hash", "parentHash"]),
		timestamp: fields.timestamp(&["timestamp"])?,
		state_root: fields.string(&["state_root", "stateRoot"]),
		tx_root: fields.string(&["tx_root", "txRoot"]),
		difficulty: fields.string(&["difficulty"]),
		nonce: fields.string(&["nonce"]),
	})
}

/// Decodes a transaction, `creation_timestamp` taking precedence over `timestamp`
pub fn decode_transaction(value: &Value) -> Result<Transaction, BlockChainError> {
	let fields = Fields::new(value, "transaction")?;

	let inputs = fields
		.array(&["inputs"])
		.iter()
		.filter(|input| input.is_object())
		.map(decode_input)
		.collect::<Result<Vec<_>, _>>()?;
	let outputs = fields
		.array(&["outputs"])
		.iter()
		.filter(|output| output.is_object())
		.map(decode_output)
		.collect::<Result<Vec<_>, _>>()?;

	Ok(Transaction {
		tx_hash: fields.string(&["tx_hash", "hash", "txHash"]),
		version: fields.u32(&["version"])?,
		nonce: fields.u64(&["nonce"])?,
		timestamp: fields.timestamp(&["creation_timestamp", "timestamp"])?,
		chain_id: fields.string(&["chain_id", "chainId"]),
		status: fields.string(&["status"]),
		block_hash: fields.string(&["block_hash", "blockHash"]),
		block_height: fields.u64(&["block_height", "blockHeight"])?,
		tx_index: fields.u32(&["tx_index", "txIndex"])?,
		inputs,
		outputs,
		from: fields.string(&["from"]),
		to: fields.string(&["to"]),
		value: fields.amount(&["value"])?.unwrap_or_default(),
		fee: fields.amount(&["fee"])?.unwrap_or_default(),
	})
}

fn decode_input(value: &Value) -> Result<TxInput, BlockChainError> {
	let fields = Fields::new(value, "transaction input")?;

	let previous_output = match fields.object(&["previous_output", "previousOutput"]) {
		Some(outpoint) => Some(OutPoint {
			tx_id: outpoint.string(&["tx_id", "txId"]),
			output_index: outpoint.u32(&["output_index", "outputIndex"])?,
		}),
		None => None,
	};

	let unlocking_proof_type = PROOF_KEYS
		.iter()
		.find(|(key, _)| fields.map.contains_key(*key))
		.map(|(_, kind)| *kind)
		.unwrap_or_default();

	Ok(TxInput {
		previous_output,
		is_reference_only: fields.bool(&["is_reference_only", "isReferenceOnly"]),
		sequence: fields.u32(&["sequence"])?,
		unlocking_proof_type,
	})
}

fn decode_output(value: &Value) -> Result<TxOutput, BlockChainError> {
	let fields = Fields::new(value, "transaction output")?;

	let payload = if let Some(asset) = fields.object(&["asset"]) {
		let contract_token = match asset.object(&["contract_token", "contractToken"]) {
			Some(token) => Some(ContractTokenAsset {
				contract_address: token.string(&["contract_address", "contractAddress"]),
				amount: token.amount(&["amount"])?.unwrap_or_default(),
			}),
			None => None,
		};
		let native_amount = match asset.object(&["native_coin", "nativeCoin"]) {
			Some(native) => Some(native.amount(&["amount"])?.unwrap_or_default()),
			None => None,
		};
		OutputPayload::Asset(AssetOutput {
			native_amount,
			contract_token,
		})
	} else if let Some(resource) = fields.object(&["resource"]) {
		let inner = resource.object(&["resource"]);
		let descriptor = inner.as_ref().unwrap_or(&resource);
		OutputPayload::Resource(ResourceOutput {
			content_hash: descriptor.string(&["content_hash", "contentHash"]),
			category: descriptor.string(&["category"]),
			executable_type: descriptor.string(&["executable_type", "executableType"]),
			mime_type: descriptor.string(&["mime_type", "mimeType"]),
			size: descriptor.u64(&["size"])?,
			creation_timestamp: resource.timestamp(&["creation_timestamp", "creationTimestamp"])?,
			is_immutable: resource.bool(&["is_immutable", "isImmutable"]),
		})
	} else if let Some(state) = fields.object(&["state"]) {
		OutputPayload::State(StateOutput {
			state_id: state.string(&["state_id", "stateId"]),
			state_version: state.u64(&["state_version", "stateVersion"])?,
			execution_result_hash: state.string(&["execution_result_hash", "executionResultHash"]),
			parent_state_hash: state.string(&["parent_state_hash", "parentStateHash"]),
		})
	} else {
		OutputPayload::Unknown
	};

	Ok(TxOutput {
		owner: fields.string(&["owner"]),
		locking_conditions: fields.array(&["locking_conditions", "lockingConditions"]).to_vec(),
		payload,
	})
}

pub fn decode_transactions(value: &Value) -> Result<Vec<Transaction>, BlockChainError> {
	let items = match value {
		Value::Array(items) => items.as_slice(),
		Value::Object(_) => Fields::new(value, "transaction list")?.array(&["transactions"]),
		other => {
			return Err(malformed(
				"transaction list",
				format!("expected an array, got {}", other),
			))
		}
	};
	items.iter().map(decode_transaction).collect()
}

pub fn decode_receipt(value: &Value) -> Result<Receipt, BlockChainError> {
	let fields = Fields::new(value, "receipt")?;

	let logs = fields
		.array(&["logs"])
		.iter()
		.map(|log| {
			let log = Fields::new(log, "receipt log")?;
			Ok(Log {
				address: log.string(&["address"]),
				topics: log.strings(&["topics"]),
				data: log.string(&["data"]),
			})
		})
		.collect::<Result<Vec<_>, BlockChainError>>()?;

	Ok(Receipt {
		tx_hash: fields.string(&["tx_hash", "txHash", "hash"]),
		block_hash: fields.string(&["block_hash", "blockHash"]),
		block_height: fields.u64(&["block_height", "blockHeight"])?,
		status: fields.string(&["status"]),
		gas_used: fields.amount(&["gas_used", "gasUsed"])?.unwrap_or_default(),
		logs,
	})
}

/// Result of a node-built transfer: `{txHash, accepted, reason}`
pub fn decode_send_result(value: &Value) -> Result<SendTxResult, BlockChainError> {
	if let Value::String(tx_hash) = value {
		return Ok(SendTxResult::accepted(tx_hash.clone()));
	}

	let fields = Fields::new(value, "submission result")?;
	let reason = fields.string(&["reason", "message"]);
	Ok(SendTxResult {
		tx_hash: fields.string(&["tx_hash", "txHash", "hash"]),
		accepted: fields.bool(&["accepted"]),
		reason: (!reason.is_empty()).then_some(reason),
	})
}

pub fn decode_fee_estimate(value: &Value) -> Result<FeeEstimate, BlockChainError> {
	let fields = Fields::new(value, "fee estimate")?;
	Ok(FeeEstimate {
		base_fee: fields.amount(&["base_fee", "baseFee"])?.unwrap_or_default(),
		priority_fee: fields.amount(&["priority_fee", "priorityFee"])?.unwrap_or_default(),
		total_fee: fields.amount(&["total_fee", "totalFee"])?.unwrap_or_default(),
		gas_limit: fields.u64(&["gas_limit", "gasLimit"])?,
		suggested_tip: fields.amount(&["suggested_tip", "suggestedTip"])?.unwrap_or_default(),
	})
}

/// Decodes a balance of `address`, which fills in an address the node left out
pub fn decode_balance(value: &Value, address: &str) -> Result<Balance, BlockChainError> {
	let fields = Fields::new(value, "balance")?;
	let answered = fields.string(&["address"]);
	Ok(Balance {
		address: if answered.is_empty() {
			address.to_string()
		} else {
			answered
		},
		balance: fields
			.amount(&["balance"])?
			.unwrap_or_else(|| "0".to_string()),
		height: fields.u64(&["height", "block_height", "blockHeight"])?,
		hash: fields.string(&["hash", "block_hash", "blockHash"]),
		state_root: fields.string(&["state_root", "stateRoot"]),
		timestamp: fields.timestamp(&["timestamp"])?,
	})
}

/// Holds an answer to the height it was asked for
///
/// A missing (zero) height takes the requested one. Any other height means the node answered
/// for different state, which is a malformed answer.
pub fn enforce_height(
	what: &str,
	height: &mut u64,
	requested: Option<u64>,
) -> Result<(), BlockChainError> {
	let Some(requested) = requested else {
		return Ok(());
	};
	if *height == 0 {
		*height = requested;
	} else if *height != requested {
		return Err(malformed(
			what,
			format!(
				"answered at height {} instead of the requested height {}",
				height, requested
			),
		));
	}
	Ok(())
}

/// Token balances may carry the amount as decimal, hex or plain integer under different names
pub fn decode_token_balance(value: &Value) -> Result<TokenBalance, BlockChainError> {
	let fields = Fields::new(value, "token balance")?;
	let balance = match fields.amount(&["balance"])? {
		Some(balance) => balance,
		None => fields
			.amount(&["balance_hex", "balance_uint64"])?
			.unwrap_or_else(|| "0".to_string()),
	};

	Ok(TokenBalance {
		address: fields.string(&["address"]),
		content_hash: fields.string(&["content_hash", "contentHash"]),
		contract_address: fields.string(&["contract_address", "contractAddress"]),
		token_id: fields.string(&["token_id", "tokenId"]),
		balance,
		height: fields.u64(&["height", "block_height", "blockHeight"])?,
		hash: fields.string(&["hash", "block_hash", "blockHash"]),
		state_root: fields.string(&["stateRoot", "state_root"]),
		timestamp: fields.timestamp(&["timestamp"])?,
		utxo_count: fields.u64(&["utxo_count", "utxoCount"])?,
	})
}

/// Accepts `{utxos: [...]}` or a bare array; a missing list is empty
pub fn decode_utxos(value: &Value) -> Result<Vec<Utxo>, BlockChainError> {
	let items = match value {
		Value::Array(items) => items.as_slice(),
		_ => Fields::new(value, "utxo list")?.array(&["utxos"]),
	};
	items.iter().map(decode_utxo).collect()
}

fn decode_utxo(value: &Value) -> Result<Utxo, BlockChainError> {
	let fields = Fields::new(value, "utxo")?;

	let (tx_hash, output_index) = match fields.get(&["outpoint"]).and_then(Value::as_str) {
		Some(outpoint) => parse_outpoint(outpoint).map_err(|e| malformed("utxo", e))?,
		None => {
			let tx_hash = fields.string(&["tx_hash", "txHash", "tx_id", "txId"]);
			let tx_hash = tx_hash
				.strip_prefix("0x")
				.map(str::to_string)
				.unwrap_or(tx_hash);
			(tx_hash, fields.u32(&["output_index", "outputIndex", "index"])?)
		}
	};

	Ok(Utxo {
		tx_hash,
		output_index,
		amount: fields.amount(&["amount", "value"])?.unwrap_or_else(|| "0".to_string()),
		address: fields.string(&["address", "owner"]),
		lock_script: fields.string(&["lock_script", "lockScript"]),
		confirmations: fields.u64(&["confirmations"])?,
	})
}

pub fn decode_call_result(value: &Value) -> Result<CallResult, BlockChainError> {
	if let Value::String(output) = value {
		return Ok(CallResult {
			output: output.clone(),
			success: true,
			..CallResult::default()
		});
	}

	let fields = Fields::new(value, "call result")?;
	let error = fields.string(&["error"]);
	Ok(CallResult {
		output: fields.string(&["output", "result", "return_data"]),
		gas_used: fields.amount(&["gas_used", "gasUsed"])?.unwrap_or_default(),
		success: fields
			.get(&["success"])
			.map(|_| fields.bool(&["success"]))
			.unwrap_or(error.is_empty()),
		error: (!error.is_empty()).then_some(error),
	})
}

pub fn decode_txpool_status(value: &Value) -> Result<TxPoolStatus, BlockChainError> {
	let fields = Fields::new(value, "txpool status")?;
	let pending = fields.u64(&["pending"])?;
	let queued = fields.u64(&["queued"])?;
	let total = match fields.get(&["total"]) {
		Some(_) => fields.u64(&["total"])?,
		None => pending.saturating_add(queued),
	};
	Ok(TxPoolStatus {
		pending,
		queued,
		total,
	})
}

pub fn decode_txpool_content(value: &Value) -> Result<TxPoolContent, BlockChainError> {
	let fields = Fields::new(value, "txpool content")?;

	let group = |key: &str| -> Result<BTreeMap<String, Vec<Transaction>>, BlockChainError> {
		let mut grouped = BTreeMap::new();
		if let Some(by_sender) = fields.get(&[key]).and_then(Value::as_object) {
			for (sender, transactions) in by_sender {
				grouped.insert(sender.clone(), decode_transactions(transactions)?);
			}
		}
		Ok(grouped)
	};

	Ok(TxPoolContent {
		pending: group("pending")?,
		queued: group("queued")?,
	})
}

pub fn decode_merkle_proof(value: &Value) -> Result<MerkleProof, BlockChainError> {
	let fields = Fields::new(value, "merkle proof")?;
	Ok(MerkleProof {
		tx_hash: fields.string(&["tx_hash", "txHash"]),
		block_hash: fields.string(&["block_hash", "blockHash"]),
		block_height: fields.u64(&["block_height", "blockHeight"])?,
		tx_index: fields.u32(&["tx_index", "txIndex"])?,
		siblings: fields.strings(&["siblings", "proof"]),
		root: fields.string(&["root", "merkle_root", "merkleRoot"]),
	})
}

/// Returns `None` when the node reports the contract lookup as unsuccessful
pub fn decode_contract_metadata(value: &Value) -> Result<Option<ContractMetadata>, BlockChainError> {
	let fields = Fields::new(value, "contract metadata")?;
	if fields.get(&["success"]).is_some() && !fields.bool(&["success"]) {
		return Ok(None);
	}

	Ok(Some(ContractMetadata {
		content_hash: fields.string(&["content_hash", "contentHash"]),
		name: fields.string(&["name"]),
		version: fields.string(&["version"]),
		abi_version: fields.string(&["abi_version", "abiVersion"]),
		exported_functions: fields.strings(&["exported_functions", "exportedFunctions"]),
		description: fields.string(&["description"]),
		size: fields.u64(&["size"])?,
		mime_type: fields.string(&["mime_type", "mimeType"]),
		creation_time: fields.timestamp(&["creation_time", "creationTime"])?,
		owner: fields.string(&["owner"]),
	}))
}

pub fn decode_event(value: &Value) -> Result<Event, BlockChainError> {
	let fields = Fields::new(value, "event")?;
	Ok(Event {
		event_type: fields.string(&["type", "event_type", "eventType"]),
		data: fields.get(&["data"]).cloned().unwrap_or(Value::Null),
		removed: fields.bool(&["removed"]),
		reorg_id: fields.string(&["reorg_id", "reorgId"]),
		resume_token: fields.string(&["resume_token", "resumeToken"]),
		height: fields.u64(&["height", "block_height", "blockHeight"])?,
		hash: fields.string(&["hash", "block_hash", "blockHash"]),
		timestamp: fields.timestamp(&["timestamp"])?,
	})
}

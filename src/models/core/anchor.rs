use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Pins a state query to a specific point in chain history.
///
/// A query issued with the same anchor against an unchanged chain always observes the same
/// state, regardless of how far the head has moved since. Absence of an anchor means
/// "latest observed state".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateAnchor {
	/// Block height to read state at
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub height: Option<u64>,
	/// Block hash to read state at
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub hash: Option<String>,
}

impl StateAnchor {
	/// Anchors a query at the given block height
	pub fn at_height(height: u64) -> Self {
		Self {
			height: Some(height),
			hash: None,
		}
	}

	/// Anchors a query at the given block hash
	pub fn at_hash(hash: impl Into<String>) -> Self {
		Self {
			height: None,
			hash: Some(hash.into()),
		}
	}

	/// Returns true when neither height nor hash is set
	pub fn is_empty(&self) -> bool {
		self.height.is_none() && self.hash.is_none()
	}

	/// Anchor object for the JSON-RPC protocol: `{"blockHeight": "0x..", "blockHash": ".."}`
	pub fn to_rpc_param(&self) -> Value {
		let mut param = Map::new();
		if let Some(height) = self.height {
			param.insert("blockHeight".to_string(), json!(format!("0x{:x}", height)));
		}
		if let Some(hash) = &self.hash {
			param.insert("blockHash".to_string(), json!(hash));
		}
		Value::Object(param)
	}

	/// Query parameters for the REST protocol (`at_height`, `at_hash`)
	pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
		let mut pairs = Vec::new();
		if let Some(height) = self.height {
			pairs.push(("at_height", height.to_string()));
		}
		if let Some(hash) = &self.hash {
			pairs.push(("at_hash", hash.clone()));
		}
		pairs
	}
}

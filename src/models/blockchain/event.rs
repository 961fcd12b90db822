use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event streams a subscriber can attach to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubscriptionType {
	#[serde(rename = "newHeads")]
	NewHeads,
	#[serde(rename = "logs")]
	Logs,
	#[serde(rename = "newPendingTxs")]
	NewPendingTxs,
}

impl SubscriptionType {
	pub fn as_str(&self) -> &'static str {
		match self {
			SubscriptionType::NewHeads => "newHeads",
			SubscriptionType::Logs => "logs",
			SubscriptionType::NewPendingTxs => "newPendingTxs",
		}
	}
}

impl fmt::Display for SubscriptionType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for SubscriptionType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"newHeads" => Ok(SubscriptionType::NewHeads),
			"logs" => Ok(SubscriptionType::Logs),
			"newPendingTxs" => Ok(SubscriptionType::NewPendingTxs),
			other => Err(format!(
				"Unknown subscription type '{}', expected newHeads, logs or newPendingTxs",
				other
			)),
		}
	}
}

/// Event pushed to a subscriber
///
/// `removed == true` marks an event whose block was dropped by a reorganization. Consumers
/// roll back whatever they derived from the original delivery. `resume_token` is an opaque
/// cursor: persisting it allows resubscribing after a disconnect without gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
	pub event_type: String,
	pub data: Value,
	pub removed: bool,
	pub reorg_id: String,
	pub resume_token: String,
	pub height: u64,
	pub hash: String,
	/// Unix seconds
	pub timestamp: u64,
}

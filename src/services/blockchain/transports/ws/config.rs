//! WebSocket configuration for subscription clients
//!
//! Connection and message timeouts plus the capacities of the per-subscription queues.

use std::time::Duration;

/// Default capacity of a subscription's event queue
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 100;
/// Default capacity of a subscription's error queue
pub const DEFAULT_ERROR_QUEUE_CAPACITY: usize = 10;

/// WebSocket configuration for subscription clients
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WsConfig {
	/// How long to wait for the initial handshake
	pub connection_timeout: Duration,
	/// How long to wait for the answer to a request
	pub message_timeout: Duration,
	/// Events buffered per subscription before new ones are dropped
	pub event_queue_capacity: usize,
	/// Errors buffered per subscription before new ones are dropped
	pub error_queue_capacity: usize,
}

impl Default for WsConfig {
	fn default() -> Self {
		Self {
			connection_timeout: Duration::from_secs(10),
			message_timeout: Duration::from_secs(5),
			event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
			error_queue_capacity: DEFAULT_ERROR_QUEUE_CAPACITY,
		}
	}
}

impl WsConfig {
	pub fn new() -> Self {
		Self::default()
	}

	/// Short timeouts, mostly for testing purposes
	pub fn single_attempt() -> Self {
		Self {
			connection_timeout: Duration::from_secs(1),
			message_timeout: Duration::from_secs(1),
			..Self::default()
		}
	}

	pub fn with_connection_timeout(mut self, connection_timeout: Duration) -> Self {
		self.connection_timeout = connection_timeout;
		self
	}

	pub fn with_message_timeout(mut self, message_timeout: Duration) -> Self {
		self.message_timeout = message_timeout;
		self
	}

	/// Sets the event queue capacity, at least one
	pub fn with_event_queue_capacity(mut self, capacity: usize) -> Self {
		self.event_queue_capacity = capacity.max(1);
		self
	}

	/// Sets the error queue capacity, at least one
	pub fn with_error_queue_capacity(mut self, capacity: usize) -> Self {
		self.error_queue_capacity = capacity.max(1);
		self
	}
}

//! Endpoint and client configuration models.
//!
//! An [`Endpoint`] describes one remote node and the protocol addresses it exposes. A
//! [`ClientConfig`] groups the endpoints a caller wants to use together with the timing knobs of
//! the failover orchestrator.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::config::ConfigError;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default number of attempts made by the failover orchestrator
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
/// Default linear backoff unit between attempts
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);
/// Default period of the background health probe
pub const DEFAULT_HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// A remote node and the protocol addresses it exposes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
	/// Human readable name, used in logs and health reports
	pub name: String,
	/// Failover preference, lower is preferred
	#[serde(default)]
	pub priority: u32,
	/// JSON-RPC over HTTP address
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub primary_address: Option<String>,
	/// REST over HTTP address
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub secondary_address: Option<String>,
	/// WebSocket address for subscriptions
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub streaming_address: Option<String>,
}

impl Endpoint {
	/// Creates an endpoint without any address
	pub fn new(name: impl Into<String>, priority: u32) -> Self {
		Self {
			name: name.into(),
			priority,
			primary_address: None,
			secondary_address: None,
			streaming_address: None,
		}
	}

	pub fn with_primary(mut self, address: impl Into<String>) -> Self {
		self.primary_address = Some(address.into());
		self
	}

	pub fn with_secondary(mut self, address: impl Into<String>) -> Self {
		self.secondary_address = Some(address.into());
		self
	}

	pub fn with_streaming(mut self, address: impl Into<String>) -> Self {
		self.streaming_address = Some(address.into());
		self
	}

	/// True when the endpoint can answer request/response operations
	pub fn has_request_address(&self) -> bool {
		self.primary_address.is_some() || self.secondary_address.is_some()
	}

	/// Validates the endpoint's name and address schemes
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.name.trim().is_empty() {
			return Err(ConfigError::invalid("Endpoint name is required"));
		}

		if !self.has_request_address() && self.streaming_address.is_none() {
			return Err(ConfigError::invalid(format!(
				"Endpoint '{}' must define at least one address",
				self.name
			)));
		}

		for address in [&self.primary_address, &self.secondary_address]
			.into_iter()
			.flatten()
		{
			validate_address(&self.name, address, &["http", "https"])?;
		}

		if let Some(address) = &self.streaming_address {
			validate_address(&self.name, address, &["ws", "wss"])?;
		}

		Ok(())
	}
}

fn validate_address(endpoint: &str, address: &str, schemes: &[&str]) -> Result<(), ConfigError> {
	let url = Url::parse(address).map_err(|e| {
		ConfigError::invalid(format!(
			"Endpoint '{}' has an invalid address '{}': {}",
			endpoint, address, e
		))
	})?;

	if !schemes.contains(&url.scheme()) {
		return Err(ConfigError::invalid(format!(
			"Endpoint '{}' address '{}' must use one of the schemes: {}",
			endpoint,
			address,
			schemes.join(", ")
		)));
	}

	Ok(())
}

/// Configuration of a multi-endpoint client
///
/// Durations left at zero are replaced by their defaults in [`ClientConfig::with_defaults`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
	pub endpoints: Vec<Endpoint>,
	/// Per-request timeout applied by the HTTP clients
	pub timeout: Duration,
	/// Number of attempts made by the failover orchestrator
	pub retry_attempts: u32,
	/// Linear backoff unit, attempt `i` is followed by a sleep of `retry_backoff * (i + 1)`
	pub retry_backoff: Duration,
	/// Period of the background health probe
	pub health_check_interval: Duration,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			endpoints: Vec::new(),
			timeout: DEFAULT_TIMEOUT,
			retry_attempts: DEFAULT_RETRY_ATTEMPTS,
			retry_backoff: DEFAULT_RETRY_BACKOFF,
			health_check_interval: DEFAULT_HEALTH_CHECK_INTERVAL,
		}
	}
}

impl ClientConfig {
	pub fn new(endpoints: Vec<Endpoint>) -> Self {
		Self {
			endpoints,
			..Self::default()
		}
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn with_retry_attempts(mut self, retry_attempts: u32) -> Self {
		self.retry_attempts = retry_attempts;
		self
	}

	pub fn with_retry_backoff(mut self, retry_backoff: Duration) -> Self {
		self.retry_backoff = retry_backoff;
		self
	}

	pub fn with_health_check_interval(mut self, health_check_interval: Duration) -> Self {
		self.health_check_interval = health_check_interval;
		self
	}

	/// Replaces unset (zero) values with their defaults
	pub fn with_defaults(mut self) -> Self {
		if self.timeout.is_zero() {
			self.timeout = DEFAULT_TIMEOUT;
		}
		if self.retry_attempts == 0 {
			self.retry_attempts = DEFAULT_RETRY_ATTEMPTS;
		}
		if self.retry_backoff.is_zero() {
			self.retry_backoff = DEFAULT_RETRY_BACKOFF;
		}
		if self.health_check_interval.is_zero() {
			self.health_check_interval = DEFAULT_HEALTH_CHECK_INTERVAL;
		}
		self
	}

	/// Validates the endpoint list
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.endpoints.is_empty() {
			return Err(ConfigError::invalid(
				"At least one endpoint is required",
			));
		}

		for endpoint in &self.endpoints {
			endpoint.validate()?;
		}

		Ok(())
	}

	/// Looks up an endpoint by name
	pub fn endpoint(&self, name: &str) -> Option<&Endpoint> {
		self.endpoints.iter().find(|endpoint| endpoint.name == name)
	}
}

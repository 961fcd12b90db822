use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::models::{ClientConfig, ConfigLoader, Endpoint};

use super::error::ConfigError;

/// On-disk form of [`ClientConfig`], durations in milliseconds
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct ClientConfigFile {
	endpoints: Vec<Endpoint>,
	#[serde(default)]
	timeout_ms: u64,
	#[serde(default)]
	retry_attempts: u32,
	#[serde(default)]
	retry_backoff_ms: u64,
	#[serde(default)]
	health_check_interval_ms: u64,
}

impl From<ClientConfigFile> for ClientConfig {
	fn from(file: ClientConfigFile) -> Self {
		ClientConfig {
			endpoints: file.endpoints,
			timeout: Duration::from_millis(file.timeout_ms),
			retry_attempts: file.retry_attempts,
			retry_backoff: Duration::from_millis(file.retry_backoff_ms),
			health_check_interval: Duration::from_millis(file.health_check_interval_ms),
		}
		.with_defaults()
	}
}

impl ConfigLoader for ClientConfig {
	fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
		if !Self::is_json_file(path) {
			return Err(ConfigError::unreadable(path, "not a JSON file", None));
		}

		let file = std::fs::File::open(path)
			.map_err(|e| ConfigError::unreadable(path, "cannot open", Some(e)))?;
		let raw: ClientConfigFile =
			serde_json::from_reader(file).map_err(|e| ConfigError::unparsable(path, e))?;
		let config = ClientConfig::from(raw);

		ConfigLoader::validate(&config)?;

		Ok(config)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		ClientConfig::validate(self)
	}
}

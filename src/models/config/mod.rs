//! Configuration loading and validation.
//!
//! The library itself only consumes [`crate::models::ClientConfig`] values. Loading one from
//! disk is offered through [`ConfigLoader`] for binaries built on top of it.

use std::path::Path;

mod client_config;
mod error;

pub use error::ConfigError;

/// Common interface for loading configuration files
pub trait ConfigLoader: Sized {
	/// Loads and validates a configuration from a JSON file
	fn load_from_path(path: &Path) -> Result<Self, ConfigError>;

	fn validate(&self) -> Result<(), ConfigError>;

	fn is_json_file(path: &Path) -> bool {
		path.extension()
			.map(|ext| ext.to_string_lossy().to_lowercase() == "json")
			.unwrap_or(false)
	}
}

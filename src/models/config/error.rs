//! Errors raised while loading or validating a [`crate::models::ClientConfig`].

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
#[allow(clippy::enum_variant_names)]
pub enum ConfigError {
	/// An endpoint list or endpoint breaks a configuration rule
	#[error("Validation error: {0}")]
	ValidationError(String),

	/// The file is not JSON of the expected layout
	#[error("Parse error in {}: {source}", path.display())]
	ParseError {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	/// The file could not be opened or is not a JSON file
	#[error("File error for {}: {reason}", path.display())]
	FileError {
		path: PathBuf,
		reason: String,
		#[source]
		source: Option<std::io::Error>,
	},
}

impl ConfigError {
	/// Rejects a configuration value, logging the rule it broke
	pub fn invalid(msg: impl Into<String>) -> Self {
		let msg = msg.into();
		tracing::warn!(reason = %msg, "Configuration rejected");
		Self::ValidationError(msg)
	}

	pub fn unparsable(path: &Path, source: serde_json::Error) -> Self {
		tracing::warn!(path = %path.display(), error = %source, "Configuration file is malformed");
		Self::ParseError {
			path: path.to_path_buf(),
			source,
		}
	}

	pub fn unreadable(
		path: &Path,
		reason: impl Into<String>,
		source: Option<std::io::Error>,
	) -> Self {
		let reason = reason.into();
		tracing::warn!(path = %path.display(), reason = %reason, "Configuration file unreadable");
		Self::FileError {
			path: path.to_path_buf(),
			reason,
			source,
		}
	}
}

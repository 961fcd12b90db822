//! Error context shared by the crate's error types.
//!
//! Every error variant that wraps an [`ErrorContext`] carries a human readable message, an
//! optional source error, free-form metadata, a creation timestamp and a trace id that ties
//! the log line emitted at creation time to the value the caller eventually receives.

use std::{collections::HashMap, fmt};

use chrono::Utc;
use uuid::Uuid;

/// Boxed error used as the source of an [`ErrorContext`]
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Context attached to an error
#[derive(Debug)]
pub struct ErrorContext {
	/// Human readable message
	pub message: String,
	/// Underlying error, if any
	pub source: Option<BoxedSource>,
	/// Additional key/value details (endpoint, method, status, ...)
	pub metadata: Option<HashMap<String, String>>,
	/// RFC 3339 creation time
	pub timestamp: String,
	/// Correlates the creation log line with the returned error
	pub trace_id: String,
}

impl ErrorContext {
	/// Creates a context without logging
	pub fn new(
		message: impl Into<String>,
		source: Option<BoxedSource>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self {
			message: message.into(),
			source,
			metadata,
			timestamp: Utc::now().to_rfc3339(),
			trace_id: Uuid::new_v4().to_string(),
		}
	}

	/// Creates a context and logs it at error level
	pub fn new_with_log(
		message: impl Into<String>,
		source: Option<BoxedSource>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		let context = Self::new(message, source, metadata);
		context.log();
		context
	}

	fn log(&self) {
		match &self.source {
			Some(source) => tracing::error!(
				trace_id = %self.trace_id,
				metadata = ?self.metadata,
				error.source = %source,
				"{}",
				self.message
			),
			None => tracing::error!(
				trace_id = %self.trace_id,
				metadata = ?self.metadata,
				"{}",
				self.message
			),
		}
	}

	/// Returns a metadata value
	pub fn metadata_value(&self, key: &str) -> Option<&str> {
		self.metadata
			.as_ref()
			.and_then(|metadata| metadata.get(key))
			.map(String::as_str)
	}
}

impl fmt::Display for ErrorContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.source {
			Some(source) => write!(f, "{}: {}", self.message, source),
			None => write!(f, "{}", self.message),
		}
	}
}

/// Errors that expose the trace id of their context
pub trait TraceableError: std::error::Error + Send + Sync {
	fn trace_id(&self) -> String;
}

//! Transport error types.
//!
//! Failures of a single HTTP exchange, before any protocol interpretation of the response.

use std::collections::HashMap;

use thiserror::Error;

use crate::utils::logging::error::{BoxedSource, ErrorContext, TraceableError};

#[derive(Debug, Error)]
pub enum TransportError {
	/// The request could not be sent or no response arrived
	#[error("Network error: {0}")]
	Network(Box<ErrorContext>),

	/// The remote answered with a non-2xx status
	#[error("HTTP error: status {status} from {url}: {body}")]
	Http {
		status: u16,
		url: String,
		body: String,
		context: Box<ErrorContext>,
	},

	/// The response body was not valid JSON
	#[error("Failed to parse response: {0}")]
	ResponseParse(Box<ErrorContext>),

	/// The request body could not be serialized
	#[error("Failed to serialize request: {0}")]
	RequestSerialization(Box<ErrorContext>),
}

impl TransportError {
	pub fn network(
		msg: impl Into<String>,
		source: Option<BoxedSource>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::Network(Box::new(ErrorContext::new_with_log(msg, source, metadata)))
	}

	pub fn http(
		status: u16,
		url: impl Into<String>,
		body: impl Into<String>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		let url = url.into();
		let body = body.into();
		Self::Http {
			context: Box::new(ErrorContext::new_with_log(
				format!("HTTP error: status {} from {}", status, url),
				None,
				metadata,
			)),
			status,
			url,
			body,
		}
	}

	pub fn response_parse(
		msg: impl Into<String>,
		source: Option<BoxedSource>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::ResponseParse(Box::new(ErrorContext::new_with_log(msg, source, metadata)))
	}

	pub fn request_serialization(
		msg: impl Into<String>,
		source: Option<BoxedSource>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::RequestSerialization(Box::new(ErrorContext::new_with_log(msg, source, metadata)))
	}

	pub fn context(&self) -> &ErrorContext {
		match self {
			Self::Network(context)
			| Self::ResponseParse(context)
			| Self::RequestSerialization(context) => context,
			Self::Http { context, .. } => context,
		}
	}
}

impl TraceableError for TransportError {
	fn trace_id(&self) -> String {
		self.context().trace_id.clone()
	}
}

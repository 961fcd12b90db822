//! Blockchain client error types and handling.
//!
//! Every failure surfaced by a client is a [`BlockChainError`]. Beyond its message, each variant
//! carries a coarse [`ErrorKind`] and a [`FailureDisposition`] telling the failover layer whether
//! the failure is worth retrying on another endpoint, worth redirecting, or final.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use crate::{
	services::blockchain::transports::TransportError,
	utils::logging::error::{BoxedSource, ErrorContext, TraceableError},
};

/// JSON-RPC 2.0 reserved error codes
pub mod rpc_codes {
	pub const PARSE_ERROR: i64 = -32700;
	pub const INVALID_REQUEST: i64 = -32600;
	pub const METHOD_NOT_FOUND: i64 = -32601;
	pub const INVALID_PARAMS: i64 = -32602;
	pub const INTERNAL_ERROR: i64 = -32603;
	pub const SERVER_ERROR_MIN: i64 = -32099;
	pub const SERVER_ERROR_MAX: i64 = -32000;
}

/// Message fragments identifying a rejection by the node's business rules
const BUSINESS_KEYWORDS: [&str; 7] = [
	"insufficient",
	"nonce",
	"signature",
	"rejected",
	"already known",
	"underpriced",
	"duplicate",
];

/// Coarse classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	Network,
	Protocol,
	Business,
	Unsupported,
	Cancelled,
	Config,
}

/// What the failover layer does with a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureDisposition {
	/// Mark the endpoint unhealthy, back off and try again
	Retry,
	/// Try another endpoint without penalizing this one
	Redirect,
	/// Return to the caller as is
	Propagate,
}

/// Represents possible errors that can occur during blockchain operations
#[derive(Debug, Error)]
pub enum BlockChainError {
	/// The request never produced a response
	#[error("Network error: {0}")]
	Network(Box<ErrorContext>),

	/// Non-2xx HTTP status not mapped to a more specific variant
	#[error("HTTP error {status}: {context}")]
	Http {
		status: u16,
		context: Box<ErrorContext>,
	},

	/// The response could not be decoded
	#[error("Malformed response: {0}")]
	MalformedResponse(Box<ErrorContext>),

	/// Server-side protocol error that may succeed elsewhere
	#[error("RPC error {code}: {message}")]
	Rpc {
		code: i64,
		message: String,
		data: Option<Value>,
		context: Box<ErrorContext>,
	},

	/// The remote does not know the method
	#[error("Method not found: {method}")]
	MethodNotFound {
		method: String,
		context: Box<ErrorContext>,
	},

	/// The request was rejected as invalid
	#[error("Invalid params: {0}")]
	InvalidParams(Box<ErrorContext>),

	/// The node rejected the request under its business rules
	#[error("Rejected by node ({code}): {message}")]
	Business {
		code: i64,
		message: String,
		context: Box<ErrorContext>,
	},

	/// The looked up resource does not exist
	#[error("Not found: {resource}")]
	NotFound {
		resource: String,
		context: Box<ErrorContext>,
	},

	/// The client's transport cannot serve the operation
	#[error("{operation} is not supported by the {transport} client: {hint}")]
	Unsupported {
		operation: String,
		transport: String,
		hint: String,
		context: Box<ErrorContext>,
	},

	#[error("Operation cancelled")]
	Cancelled(Box<ErrorContext>),

	#[error("Deadline exceeded")]
	DeadlineExceeded(Box<ErrorContext>),

	/// The streaming connection went away
	#[error("Connection closed: {0}")]
	ConnectionClosed(Box<ErrorContext>),

	#[error("Configuration error: {0}")]
	Config(Box<ErrorContext>),

	/// Every attempt of the failover layer failed
	#[error("All endpoints failed after {attempts} attempts: {source}")]
	AllEndpointsFailed {
		attempts: u32,
		source: Box<BlockChainError>,
		context: Box<ErrorContext>,
	},

	/// Closing one or more clients failed
	#[error("Failed to close {} client(s): {}", .errors.len(), join_errors(.errors))]
	Close {
		errors: Vec<BlockChainError>,
		context: Box<ErrorContext>,
	},
}

fn join_errors(errors: &[BlockChainError]) -> String {
	errors
		.iter()
		.map(ToString::to_string)
		.collect::<Vec<_>>()
		.join("; ")
}

/// True when an error message describes a rejection by the node's business rules
pub fn is_business_message(message: &str) -> bool {
	let message = message.to_lowercase();
	BUSINESS_KEYWORDS
		.iter()
		.any(|keyword| message.contains(keyword))
}

/// Maps a JSON-RPC error object onto a [`BlockChainError`]
pub fn classify_rpc_error(
	code: i64,
	message: &str,
	data: Option<Value>,
	method: &str,
) -> BlockChainError {
	let metadata = Some(HashMap::from([
		("method".to_string(), method.to_string()),
		("code".to_string(), code.to_string()),
	]));

	if code == rpc_codes::METHOD_NOT_FOUND {
		return BlockChainError::method_not_found(method, metadata);
	}

	if is_business_message(message) {
		return BlockChainError::business(code, message, metadata);
	}

	match code {
		rpc_codes::PARSE_ERROR | rpc_codes::INVALID_REQUEST | rpc_codes::INVALID_PARAMS => {
			BlockChainError::invalid_params(format!("{} ({})", message, code), None, metadata)
		}
		_ => BlockChainError::rpc(code, message, data, metadata),
	}
}

impl BlockChainError {
	pub fn network(
		msg: impl Into<String>,
		source: Option<BoxedSource>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::Network(Box::new(ErrorContext::new_with_log(msg, source, metadata)))
	}

	pub fn http(status: u16, body: impl Into<String>, metadata: Option<HashMap<String, String>>) -> Self {
		Self::Http {
			status,
			context: Box::new(ErrorContext::new_with_log(body, None, metadata)),
		}
	}

	/// Maps a non-2xx status of a resource-oriented API onto the matching variant
	pub fn from_http_status(
		status: u16,
		resource: impl Into<String>,
		body: impl Into<String>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		let body = body.into();
		match status {
			400..=499 if status != 404 && is_business_message(&body) => {
				Self::business(i64::from(status), body, metadata)
			}
			400 | 422 => Self::invalid_params(body, None, metadata),
			404 => Self::not_found(resource),
			405 | 501 => Self::method_not_found(resource, metadata),
			_ => Self::http(status, body, metadata),
		}
	}

	pub fn malformed_response(
		msg: impl Into<String>,
		source: Option<BoxedSource>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::MalformedResponse(Box::new(ErrorContext::new_with_log(msg, source, metadata)))
	}

	pub fn rpc(
		code: i64,
		message: impl Into<String>,
		data: Option<Value>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		let message = message.into();
		Self::Rpc {
			code,
			context: Box::new(ErrorContext::new_with_log(message.clone(), None, metadata)),
			message,
			data,
		}
	}

	pub fn method_not_found(
		method: impl Into<String>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		let method = method.into();
		Self::MethodNotFound {
			context: Box::new(ErrorContext::new_with_log(
				format!("Method not found: {}", method),
				None,
				metadata,
			)),
			method,
		}
	}

	pub fn invalid_params(
		msg: impl Into<String>,
		source: Option<BoxedSource>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::InvalidParams(Box::new(ErrorContext::new_with_log(msg, source, metadata)))
	}

	pub fn business(
		code: i64,
		message: impl Into<String>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		let message = message.into();
		Self::Business {
			code,
			context: Box::new(ErrorContext::new_with_log(message.clone(), None, metadata)),
			message,
		}
	}

	/// Lookups of missing resources are an expected outcome and are not logged
	pub fn not_found(resource: impl Into<String>) -> Self {
		let resource = resource.into();
		Self::NotFound {
			context: Box::new(ErrorContext::new(
				format!("Not found: {}", resource),
				None,
				None,
			)),
			resource,
		}
	}

	pub fn unsupported(
		operation: impl Into<String>,
		transport: impl Into<String>,
		hint: impl Into<String>,
	) -> Self {
		let operation = operation.into();
		let transport = transport.into();
		Self::Unsupported {
			context: Box::new(ErrorContext::new(
				format!("{} is not supported by the {} client", operation, transport),
				None,
				None,
			)),
			operation,
			transport,
			hint: hint.into(),
		}
	}

	pub fn cancelled() -> Self {
		Self::Cancelled(Box::new(ErrorContext::new("Operation cancelled", None, None)))
	}

	pub fn deadline_exceeded() -> Self {
		Self::DeadlineExceeded(Box::new(ErrorContext::new_with_log(
			"Deadline exceeded",
			None,
			None,
		)))
	}

	pub fn connection_closed(
		msg: impl Into<String>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::ConnectionClosed(Box::new(ErrorContext::new_with_log(msg, None, metadata)))
	}

	pub fn config(msg: impl Into<String>, source: Option<BoxedSource>) -> Self {
		Self::Config(Box::new(ErrorContext::new_with_log(msg, source, None)))
	}

	pub fn all_endpoints_failed(attempts: u32, last_error: BlockChainError) -> Self {
		Self::AllEndpointsFailed {
			attempts,
			context: Box::new(ErrorContext::new_with_log(
				format!("All endpoints failed after {} attempts", attempts),
				None,
				None,
			)),
			source: Box::new(last_error),
		}
	}

	pub fn close(errors: Vec<BlockChainError>) -> Self {
		Self::Close {
			context: Box::new(ErrorContext::new_with_log(
				format!("Failed to close {} client(s)", errors.len()),
				None,
				None,
			)),
			errors,
		}
	}

	/// Returns the context attached to the error
	pub fn context(&self) -> &ErrorContext {
		match self {
			Self::Network(context)
			| Self::MalformedResponse(context)
			| Self::InvalidParams(context)
			| Self::Cancelled(context)
			| Self::DeadlineExceeded(context)
			| Self::ConnectionClosed(context)
			| Self::Config(context) => context,
			Self::Http { context, .. }
			| Self::Rpc { context, .. }
			| Self::MethodNotFound { context, .. }
			| Self::Business { context, .. }
			| Self::NotFound { context, .. }
			| Self::Unsupported { context, .. }
			| Self::AllEndpointsFailed { context, .. }
			| Self::Close { context, .. } => context,
		}
	}

	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Network(_) | Self::Http { .. } | Self::ConnectionClosed(_) | Self::Close { .. } => {
				ErrorKind::Network
			}
			Self::MalformedResponse(_)
			| Self::Rpc { .. }
			| Self::MethodNotFound { .. }
			| Self::InvalidParams(_) => ErrorKind::Protocol,
			Self::Business { .. } | Self::NotFound { .. } => ErrorKind::Business,
			Self::Unsupported { .. } => ErrorKind::Unsupported,
			Self::Cancelled(_) | Self::DeadlineExceeded(_) => ErrorKind::Cancelled,
			Self::Config(_) => ErrorKind::Config,
			Self::AllEndpointsFailed { source, .. } => source.kind(),
		}
	}

	pub fn disposition(&self) -> FailureDisposition {
		match self {
			Self::Network(_)
			| Self::Http { .. }
			| Self::MalformedResponse(_)
			| Self::Rpc { .. }
			| Self::ConnectionClosed(_) => FailureDisposition::Retry,
			Self::Unsupported { .. } | Self::MethodNotFound { .. } => FailureDisposition::Redirect,
			Self::InvalidParams(_)
			| Self::Business { .. }
			| Self::NotFound { .. }
			| Self::Cancelled(_)
			| Self::DeadlineExceeded(_)
			| Self::Config(_)
			| Self::AllEndpointsFailed { .. }
			| Self::Close { .. } => FailureDisposition::Propagate,
		}
	}

	pub fn is_retryable(&self) -> bool {
		self.disposition() == FailureDisposition::Retry
	}

	pub fn is_unsupported(&self) -> bool {
		matches!(self, Self::Unsupported { .. })
	}

	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound { .. })
	}

	pub fn is_business(&self) -> bool {
		matches!(self, Self::Business { .. })
	}

	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled(_) | Self::DeadlineExceeded(_))
	}
}

impl TraceableError for BlockChainError {
	fn trace_id(&self) -> String {
		self.context().trace_id.clone()
	}
}

/// Transport failures were logged when created, the conversion does not log again
impl From<TransportError> for BlockChainError {
	fn from(error: TransportError) -> Self {
		let message = error.to_string();
		let metadata = error.context().metadata.clone();
		match error {
			TransportError::Network(_) => Self::Network(Box::new(ErrorContext::new(
				message,
				Some(Box::new(error)),
				metadata,
			))),
			TransportError::Http { status, .. } => Self::Http {
				status,
				context: Box::new(ErrorContext::new(message, Some(Box::new(error)), metadata)),
			},
			TransportError::ResponseParse(_) => Self::MalformedResponse(Box::new(
				ErrorContext::new(message, Some(Box::new(error)), metadata),
			)),
			TransportError::RequestSerialization(_) => Self::InvalidParams(Box::new(
				ErrorContext::new(message, Some(Box::new(error)), metadata),
			)),
		}
	}
}

//! Handle to one live event stream.

use std::{fmt, sync::Arc};

use tokio::sync::mpsc;

use crate::{
	models::{Event, SubscriptionType},
	services::blockchain::BlockChainError,
};

/// Connection-side hooks a [`Subscription`] calls when it is released
pub(crate) trait SubscriptionControl: Send + Sync {
	/// Removes the local registration so no further events are routed
	fn release(&self, id: &str);

	/// Best-effort request to stop the stream on the server
	fn request_unsubscribe(&self, id: &str);
}

/// An open event stream
///
/// Events arrive on a bounded queue. Transport failures, including the loss of the connection,
/// arrive on a separate error queue. Dropping the handle unregisters it locally; call
/// [`Subscription::unsubscribe`] to also stop the stream on the server.
pub struct Subscription {
	id: String,
	event_type: SubscriptionType,
	events: mpsc::Receiver<Event>,
	errors: mpsc::Receiver<BlockChainError>,
	control: Option<Arc<dyn SubscriptionControl>>,
	closed: bool,
}

impl Subscription {
	pub(crate) fn new(
		id: String,
		event_type: SubscriptionType,
		events: mpsc::Receiver<Event>,
		errors: mpsc::Receiver<BlockChainError>,
		control: Arc<dyn SubscriptionControl>,
	) -> Self {
		Self {
			id,
			event_type,
			events,
			errors,
			control: Some(control),
			closed: false,
		}
	}

	/// A subscription fed by the given queues and bound to no connection
	pub fn detached(
		id: impl Into<String>,
		event_type: SubscriptionType,
		events: mpsc::Receiver<Event>,
		errors: mpsc::Receiver<BlockChainError>,
	) -> Self {
		Self {
			id: id.into(),
			event_type,
			events,
			errors,
			control: None,
			closed: false,
		}
	}

	/// Subscription id assigned by the server
	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn event_type(&self) -> SubscriptionType {
		self.event_type
	}

	pub fn is_active(&self) -> bool {
		!self.closed
	}

	/// Waits for the next event, `None` once the stream has ended
	pub async fn next_event(&mut self) -> Option<Event> {
		self.events.recv().await
	}

	/// Waits for the next error, `None` once the stream has ended
	pub async fn next_error(&mut self) -> Option<BlockChainError> {
		self.errors.recv().await
	}

	/// Waits for whichever comes first, an event or an error
	///
	/// Returns `None` once both queues have ended.
	pub async fn next(&mut self) -> Option<Result<Event, BlockChainError>> {
		tokio::select! {
			Some(event) = self.events.recv() => Some(Ok(event)),
			Some(error) = self.errors.recv() => Some(Err(error)),
			else => None,
		}
	}

	pub fn events(&mut self) -> &mut mpsc::Receiver<Event> {
		&mut self.events
	}

	pub fn errors(&mut self) -> &mut mpsc::Receiver<BlockChainError> {
		&mut self.errors
	}

	/// Stops the stream
	///
	/// Unregisters locally, asks the server to stop sending, closes both queues and discards
	/// anything still buffered. Calling it again does nothing.
	pub fn unsubscribe(&mut self) {
		if self.closed {
			return;
		}
		self.closed = true;

		if let Some(control) = self.control.take() {
			control.release(&self.id);
			control.request_unsubscribe(&self.id);
		}

		self.events.close();
		self.errors.close();
		while self.events.try_recv().is_ok() {}
		while self.errors.try_recv().is_ok() {}

		tracing::debug!(subscription = %self.id, "Unsubscribed");
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("id", &self.id)
			.field("event_type", &self.event_type)
			.field("closed", &self.closed)
			.finish()
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(control) = self.control.take() {
			control.release(&self.id);
		}
	}
}

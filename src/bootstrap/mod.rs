//! Bootstrap module for the command-line probe.
//!
//! Loads the client configuration, builds the failover client and provides the small pieces of
//! logic the subcommands share:
//!
//! - `load_client_config`: reads and validates the JSON configuration file
//! - `collect_status`: chain id, head, sync state and endpoint health in one report
//! - `select_streaming_endpoint`: picks the endpoint to subscribe through
//! - `forward_events`: drains a subscription until shutdown

use std::{error::Error, path::Path, sync::Arc};

use anyhow::{anyhow, Context};
use tokio_util::sync::CancellationToken;

use crate::{
	models::{ClientConfig, ConfigLoader, Endpoint, Event, SyncStatus},
	services::blockchain::{
		BlockChainClient, CallContext, EndpointStatus, FallbackClient, Subscription,
	},
};

/// Type alias for handling ServiceResult
pub type Result<T> = std::result::Result<T, Box<dyn Error>>;

/// Loads the client configuration from a JSON file
pub fn load_client_config(path: &Path) -> Result<ClientConfig> {
	let config = ClientConfig::load_from_path(path)
		.with_context(|| format!("Failed to load configuration from {}", path.display()))?;
	Ok(config)
}

/// Builds the failover client over every configured endpoint
pub fn initialize_client(config: ClientConfig) -> Result<Arc<FallbackClient>> {
	let client = FallbackClient::new(config).context("Failed to initialize the client")?;
	Ok(Arc::new(client))
}

/// Snapshot printed by the `status` subcommand
#[derive(Debug, Clone)]
pub struct StatusReport {
	pub chain_id: String,
	pub head: u64,
	pub sync: SyncStatus,
	pub endpoints: Vec<EndpointStatus>,
}

/// Queries the chain through the failover client and reports endpoint health afterwards
pub async fn collect_status(client: &FallbackClient, ctx: &CallContext) -> Result<StatusReport> {
	let chain_id = client.chain_id(ctx).await.context("Failed to read chain id")?;
	let head = client
		.block_number(ctx)
		.await
		.context("Failed to read head height")?;
	let sync = client
		.syncing(ctx)
		.await
		.context("Failed to read sync status")?;

	Ok(StatusReport {
		chain_id,
		head,
		sync,
		endpoints: client.endpoint_statuses().await,
	})
}

/// Picks the endpoint named `name`, or the preferred endpoint with a streaming address
pub fn select_streaming_endpoint<'a>(
	config: &'a ClientConfig,
	name: Option<&str>,
) -> Result<&'a Endpoint> {
	match name {
		Some(name) => {
			let endpoint = config
				.endpoint(name)
				.ok_or_else(|| anyhow!("No endpoint named '{}'", name))?;
			if endpoint.streaming_address.is_none() {
				return Err(anyhow!("Endpoint '{}' has no streaming address", name).into());
			}
			Ok(endpoint)
		}
		None => config
			.endpoints
			.iter()
			.filter(|endpoint| endpoint.streaming_address.is_some())
			.min_by_key(|endpoint| endpoint.priority)
			.ok_or_else(|| anyhow!("No endpoint has a streaming address").into()),
	}
}

/// Hands every event to `on_event` until `shutdown` fires or the stream ends
///
/// Stream errors are logged. Returns the resume token of the last delivered event so the caller
/// can resubscribe without gaps.
pub async fn forward_events<F>(
	mut subscription: Subscription,
	shutdown: CancellationToken,
	mut on_event: F,
) -> Option<String>
where
	F: FnMut(&Event),
{
	let mut resume_token = None;
	loop {
		tokio::select! {
			_ = shutdown.cancelled() => break,
			item = subscription.next() => match item {
				Some(Ok(event)) => {
					on_event(&event);
					if !event.resume_token.is_empty() {
						resume_token = Some(event.resume_token.clone());
					}
				}
				Some(Err(error)) => {
					tracing::warn!(subscription = %subscription.id(), "Subscription error: {}", error);
				}
				None => break,
			},
		}
	}

	subscription.unsubscribe();
	resume_token
}

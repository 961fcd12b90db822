//! Endpoint health tracking and the background probe.

use std::{fmt, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::{
	sync::RwLock,
	time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::services::blockchain::{CallContext, SharedClient};

/// Deadline of a single health probe, independent of any caller
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Last known state of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndpointHealth {
	/// Not probed yet
	#[default]
	Unknown,
	Healthy,
	Unhealthy,
}

impl EndpointHealth {
	/// Whether requests may be routed to the endpoint
	///
	/// Endpoints that have not been probed yet are assumed usable.
	pub fn is_usable(&self) -> bool {
		!matches!(self, EndpointHealth::Unhealthy)
	}
}

impl fmt::Display for EndpointHealth {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			EndpointHealth::Unknown => "unknown",
			EndpointHealth::Healthy => "healthy",
			EndpointHealth::Unhealthy => "unhealthy",
		})
	}
}

/// Snapshot of one endpoint of a failover client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointStatus {
	pub name: String,
	pub priority: u32,
	pub health: EndpointHealth,
	/// Time of the last completed probe
	pub last_check: Option<DateTime<Utc>>,
}

pub(crate) struct EndpointEntry {
	pub name: String,
	pub priority: u32,
	pub client: SharedClient,
	pub health: EndpointHealth,
	pub last_check: Option<DateTime<Utc>>,
}

impl EndpointEntry {
	pub fn new(name: String, priority: u32, client: SharedClient) -> Self {
		Self {
			name,
			priority,
			client,
			health: EndpointHealth::Unknown,
			last_check: None,
		}
	}

	pub fn status(&self) -> EndpointStatus {
		EndpointStatus {
			name: self.name.clone(),
			priority: self.priority,
			health: self.health,
			last_check: self.last_check,
		}
	}

	/// Records a new health state, logging transitions
	pub fn set_health(&mut self, health: EndpointHealth) {
		if self.health != health {
			match health {
				EndpointHealth::Unhealthy => tracing::warn!(
					endpoint = %self.name,
					previous = %self.health,
					"Endpoint marked unhealthy"
				),
				_ => tracing::info!(
					endpoint = %self.name,
					previous = %self.health,
					current = %health,
					"Endpoint health changed"
				),
			}
		}
		self.health = health;
	}
}

pub(crate) type Entries = Arc<RwLock<Vec<EndpointEntry>>>;

/// Probes every endpoint once per `period` until `shutdown` is cancelled
///
/// The first round runs one period after start. A round that overruns delays the next one.
pub(crate) async fn health_check_loop(
	entries: Entries,
	period: Duration,
	shutdown: CancellationToken,
) {
	let mut interval = tokio::time::interval_at(Instant::now() + period, period);
	interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		tokio::select! {
			_ = shutdown.cancelled() => break,
			_ = interval.tick() => check_all(&entries, &shutdown).await,
		}
	}
	tracing::debug!("Health check loop stopped");
}

/// Pings the endpoints one after the other
///
/// The lock is only taken to snapshot the clients and to record each result, never across a
/// ping.
pub(crate) async fn check_all(entries: &Entries, shutdown: &CancellationToken) {
	let targets: Vec<(usize, String, SharedClient)> = entries
		.read()
		.await
		.iter()
		.enumerate()
		.map(|(index, entry)| (index, entry.name.clone(), entry.client.clone()))
		.collect();

	for (index, name, client) in targets {
		let ctx = CallContext::with_cancellation(shutdown.child_token())
			.child_with_timeout(HEALTH_CHECK_TIMEOUT);
		let health = match client.ping(&ctx).await {
			Ok(()) => EndpointHealth::Healthy,
			Err(_) if shutdown.is_cancelled() => return,
			Err(e) => {
				tracing::debug!(endpoint = %name, "Health check failed: {}", e);
				EndpointHealth::Unhealthy
			}
		};

		if let Some(entry) = entries.write().await.get_mut(index) {
			entry.set_health(health);
			entry.last_check = Some(Utc::now());
		}
	}
}

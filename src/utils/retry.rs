//! Linear backoff between failover attempts.
//!
//! Attempt `i` (zero based) is followed by a sleep of `unit * (i + 1)`, so a unit of one second
//! yields 1s, 2s, 3s and so on. The transport-level exponential policy lives in
//! [`crate::utils::http`].

use std::time::Duration;

/// Delay to wait after the failed attempt `attempt`
pub fn backoff_delay(unit: Duration, attempt: u32) -> Duration {
	unit.saturating_mul(attempt.saturating_add(1))
}

/// Total time spent sleeping by `attempts` attempts
///
/// No sleep follows the last attempt.
pub fn total_backoff(unit: Duration, attempts: u32) -> Duration {
	(0..attempts.saturating_sub(1))
		.map(|attempt| backoff_delay(unit, attempt))
		.fold(Duration::ZERO, Duration::saturating_add)
}

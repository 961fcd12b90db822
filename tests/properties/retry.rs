use chain_access::utils::{backoff_delay, retry::total_backoff};
use proptest::{prelude::*, test_runner::Config};
use std::time::Duration;

proptest! {
	#![proptest_config(Config {
		failure_persistence: None,
		..Config::default()
	})]

	#[test]
	fn test_backoff_is_linear_in_attempt(unit_ms in 0u64..10_000, attempt in 0u32..1_000) {
		let unit = Duration::from_millis(unit_ms);
		prop_assert_eq!(backoff_delay(unit, attempt), unit * (attempt + 1));
		prop_assert_eq!(
			backoff_delay(unit, attempt + 1) - backoff_delay(unit, attempt),
			unit
		);
	}

	#[test]
	fn test_total_backoff_skips_the_last_attempt(unit_ms in 0u64..10_000, attempts in 0u32..100) {
		let unit = Duration::from_millis(unit_ms);
		let expected: Duration = (0..attempts.saturating_sub(1))
			.map(|attempt| backoff_delay(unit, attempt))
			.sum();
		prop_assert_eq!(total_backoff(unit, attempts), expected);

		// n attempts sleep unit * (1 + 2 + ... + (n - 1)).
		let steps = u64::from(attempts.saturating_sub(1));
		prop_assert_eq!(
			total_backoff(unit, attempts),
			Duration::from_millis(unit_ms * steps * (steps + 1) / 2)
		);
	}

	#[test]
	fn test_backoff_saturates(attempt in any::<u32>()) {
		prop_assert_eq!(backoff_delay(Duration::MAX, attempt), Duration::MAX);
	}
}

use crate::properties::strategies::{anchor_strategy, endpoints_strategy};
use chain_access::{
	bootstrap::select_streaming_endpoint,
	models::ClientConfig,
	utils::parsing::parse_u64,
};
use proptest::{prelude::*, test_runner::Config};

proptest! {
	#![proptest_config(Config {
		failure_persistence: None,
		..Config::default()
	})]

	#[test]
	fn test_rpc_param_carries_the_anchor(anchor in anchor_strategy()) {
		let param = anchor.to_rpc_param();

		match anchor.height {
			Some(height) => prop_assert_eq!(parse_u64(&param["blockHeight"]), Ok(height)),
			None => prop_assert!(param.get("blockHeight").is_none()),
		}
		match &anchor.hash {
			Some(hash) => prop_assert_eq!(param["blockHash"].as_str(), Some(hash.as_str())),
			None => prop_assert!(param.get("blockHash").is_none()),
		}
	}

	#[test]
	fn test_query_pairs_carry_the_anchor(anchor in anchor_strategy()) {
		let pairs = anchor.to_query_pairs();

		let expected = usize::from(anchor.height.is_some()) + usize::from(anchor.hash.is_some());
		prop_assert_eq!(pairs.len(), expected);
		prop_assert_eq!(anchor.is_empty(), pairs.is_empty());
		for (key, value) in pairs {
			match key {
				"at_height" => prop_assert_eq!(Some(value.parse::<u64>().unwrap()), anchor.height),
				"at_hash" => prop_assert_eq!(Some(value), anchor.hash.clone()),
				other => prop_assert!(false, "unexpected query key {}", other),
			}
		}
	}

	#[test]
	fn test_streaming_endpoint_has_lowest_priority(endpoints in endpoints_strategy()) {
		let config = ClientConfig::new(endpoints);
		let lowest = config
			.endpoints
			.iter()
			.filter(|endpoint| endpoint.streaming_address.is_some())
			.map(|endpoint| endpoint.priority)
			.min();

		match (select_streaming_endpoint(&config, None), lowest) {
			(Ok(endpoint), Some(priority)) => {
				prop_assert!(endpoint.streaming_address.is_some());
				prop_assert_eq!(endpoint.priority, priority);
			}
			(Err(_), None) => {}
			(result, lowest) => prop_assert!(
				false,
				"selected {:?} with lowest streaming priority {:?}",
				result.map(|endpoint| endpoint.name.clone()).ok(),
				lowest
			),
		}
	}
}

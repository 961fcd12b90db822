use std::{sync::Arc, time::Duration};

use mockall::predicate;

use chain_access::{
	models::{Balance, ClientConfig, Endpoint, StateAnchor, SubscriptionType},
	services::blockchain::{
		BlockChainClient, BlockChainError, CallContext, EndpointHealth, FailureDisposition,
		FallbackClient, SharedClient, FALLBACK_TRANSPORT,
	},
};

use crate::integration::mocks::MockBlockChainClient;

fn config(attempts: u32) -> ClientConfig {
	ClientConfig::default()
		.with_retry_attempts(attempts)
		.with_retry_backoff(Duration::from_secs(1))
		.with_health_check_interval(Duration::from_secs(3600))
}

/// Builds a failover client whose endpoints keep the given order as priority
fn failover(clients: Vec<(&str, MockBlockChainClient)>, config: &ClientConfig) -> FallbackClient {
	let clients = clients
		.into_iter()
		.enumerate()
		.map(|(priority, (name, client))| {
			let client: SharedClient = Arc::new(client);
			(name.to_string(), priority as u32, client)
		})
		.collect();
	FallbackClient::with_clients(clients, config).unwrap()
}

fn network_error() -> BlockChainError {
	BlockChainError::network("connection refused", None, None)
}

fn unsupported() -> BlockChainError {
	BlockChainError::unsupported("chain_id", "rest", "use the primary client")
}

#[tokio::test(start_paused = true)]
async fn test_failover_to_next_endpoint() {
	let mut primary = MockBlockChainClient::new();
	primary
		.expect_chain_id()
		.times(1)
		.returning(|_| Err(network_error()));
	let mut backup = MockBlockChainClient::new();
	backup
		.expect_chain_id()
		.times(2)
		.returning(|_| Ok("wes-mainnet".to_string()));

	let client = failover(vec![("primary", primary), ("backup", backup)], &config(3));
	let ctx = CallContext::background();

	assert_eq!(client.chain_id(&ctx).await.unwrap(), "wes-mainnet");
	assert_eq!(client.current_endpoint().await.as_deref(), Some("backup"));

	// The unhealthy primary is skipped while the backup keeps serving.
	assert_eq!(client.chain_id(&ctx).await.unwrap(), "wes-mainnet");

	let statuses = client.endpoint_statuses().await;
	assert_eq!(statuses[0].name, "primary");
	assert_eq!(statuses[0].health, EndpointHealth::Unhealthy);
	assert_eq!(statuses[1].health, EndpointHealth::Unknown);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_grows_linearly_between_attempts() {
	let mut primary = MockBlockChainClient::new();
	primary
		.expect_block_number()
		.times(2)
		.returning(|_| Err(network_error()));
	let mut backup = MockBlockChainClient::new();
	backup
		.expect_block_number()
		.times(1)
		.returning(|_| Err(network_error()));

	let client = failover(vec![("primary", primary), ("backup", backup)], &config(3));
	let started = tokio::time::Instant::now();

	let error = client
		.block_number(&CallContext::background())
		.await
		.unwrap_err();

	// 1s after the first attempt, 2s after the second, nothing after the last.
	let elapsed = started.elapsed();
	assert!(elapsed >= Duration::from_secs(3), "elapsed {:?}", elapsed);
	assert!(elapsed < Duration::from_millis(3100), "elapsed {:?}", elapsed);

	match error {
		BlockChainError::AllEndpointsFailed {
			attempts, source, ..
		} => {
			assert_eq!(attempts, 3);
			assert!(matches!(*source, BlockChainError::Network(_)));
		}
		other => panic!("unexpected error: {:?}", other),
	}
}

#[tokio::test]
async fn test_business_error_is_returned_without_failover() {
	let mut primary = MockBlockChainClient::new();
	primary
		.expect_send_raw_transaction()
		.times(1)
		.returning(|_, _| Err(BlockChainError::business(-32000, "nonce too low", None)));
	// The backup has no expectation: reaching it would panic.
	let backup = MockBlockChainClient::new();

	let client = failover(vec![("primary", primary), ("backup", backup)], &config(3));

	let error = client
		.send_raw_transaction(&CallContext::background(), "0xsigned")
		.await
		.unwrap_err();

	assert!(error.is_business());
	assert_eq!(
		client.endpoint_statuses().await[0].health,
		EndpointHealth::Unknown
	);
}

#[tokio::test]
async fn test_not_found_is_returned_without_failover() {
	let mut primary = MockBlockChainClient::new();
	primary
		.expect_get_transaction()
		.times(1)
		.returning(|_, hash| Err(BlockChainError::not_found(format!("transaction {}", hash))));
	let backup = MockBlockChainClient::new();

	let client = failover(vec![("primary", primary), ("backup", backup)], &config(3));

	let error = client
		.get_transaction(&CallContext::background(), "0xmissing")
		.await
		.unwrap_err();

	assert!(error.is_not_found());
}

#[tokio::test]
async fn test_unsupported_redirects_without_consuming_attempts() {
	let mut rest = MockBlockChainClient::new();
	rest.expect_chain_id().times(1).returning(|_| Err(unsupported()));
	let mut rpc = MockBlockChainClient::new();
	rpc.expect_chain_id()
		.times(1)
		.returning(|_| Ok("wes-testnet".to_string()));

	// A single attempt is enough: the redirect does not count.
	let client = failover(vec![("rest", rest), ("rpc", rpc)], &config(1));

	let chain_id = client.chain_id(&CallContext::background()).await.unwrap();

	assert_eq!(chain_id, "wes-testnet");
	assert_eq!(
		client.endpoint_statuses().await[0].health,
		EndpointHealth::Unknown
	);
}

#[tokio::test]
async fn test_unsupported_everywhere_returns_the_unsupported_error() {
	let mut first = MockBlockChainClient::new();
	first.expect_chain_id().times(1).returning(|_| Err(unsupported()));
	let mut second = MockBlockChainClient::new();
	second.expect_chain_id().times(1).returning(|_| Err(unsupported()));

	let client = failover(vec![("first", first), ("second", second)], &config(3));

	let error = client
		.chain_id(&CallContext::background())
		.await
		.unwrap_err();

	assert!(error.is_unsupported());
	assert_eq!(error.disposition(), FailureDisposition::Redirect);
}

#[tokio::test]
async fn test_subscribe_fails_fast() {
	let client = failover(vec![("only", MockBlockChainClient::new())], &config(3));

	let error = client
		.subscribe(
			&CallContext::background(),
			SubscriptionType::NewHeads,
			None,
			None,
		)
		.await
		.unwrap_err();

	match error {
		BlockChainError::Unsupported { transport, .. } => {
			assert_eq!(transport, FALLBACK_TRANSPORT)
		}
		other => panic!("unexpected error: {:?}", other),
	}
}

#[tokio::test]
async fn test_cancelled_context_issues_no_request() {
	let client = failover(vec![("only", MockBlockChainClient::new())], &config(3));
	let ctx = CallContext::background();
	ctx.cancel();

	let error = client.chain_id(&ctx).await.unwrap_err();

	assert!(matches!(error, BlockChainError::Cancelled(_)));
}

#[tokio::test(start_paused = true)]
async fn test_deadline_interrupts_backoff() {
	let mut primary = MockBlockChainClient::new();
	primary
		.expect_syncing()
		.times(1)
		.returning(|_| Err(network_error()));
	let mut backup = MockBlockChainClient::new();
	backup
		.expect_syncing()
		.times(1)
		.returning(|_| Err(network_error()));

	let client = failover(vec![("primary", primary), ("backup", backup)], &config(5));
	let ctx = CallContext::with_timeout(Duration::from_millis(1500));

	let error = client.syncing(&ctx).await.unwrap_err();

	assert!(matches!(error, BlockChainError::DeadlineExceeded(_)));
}

#[tokio::test(start_paused = true)]
async fn test_anchor_is_forwarded_to_every_attempt() {
	let anchor = StateAnchor::at_height(5);

	let mut primary = MockBlockChainClient::new();
	primary
		.expect_get_balance()
		.with(
			predicate::always(),
			predicate::eq("0xabc"),
			predicate::eq(Some(anchor.clone())),
		)
		.times(1)
		.returning(|_, _, _| Err(network_error()));
	let mut backup = MockBlockChainClient::new();
	backup
		.expect_get_balance()
		.with(
			predicate::always(),
			predicate::eq("0xabc"),
			predicate::eq(Some(anchor.clone())),
		)
		.times(1)
		.returning(|_, address, _| {
			Ok(Balance {
				address: address.to_string(),
				balance: "42".to_string(),
				height: 5,
				..Default::default()
			})
		});

	let client = failover(vec![("primary", primary), ("backup", backup)], &config(3));

	let balance = client
		.get_balance(&CallContext::background(), "0xabc", Some(anchor))
		.await
		.unwrap();

	assert_eq!(balance.balance, "42");
	assert_eq!(balance.height, 5);
}

#[tokio::test(start_paused = true)]
async fn test_health_probe_marks_endpoints() {
	let mut down = MockBlockChainClient::new();
	down.expect_ping().returning(|_| Err(network_error()));
	let mut up = MockBlockChainClient::new();
	up.expect_ping().returning(|_| Ok(()));
	up.expect_chain_id()
		.times(1)
		.returning(|_| Ok("wes-mainnet".to_string()));

	let config = config(3).with_health_check_interval(Duration::from_secs(10));
	let client = failover(vec![("down", down), ("up", up)], &config);

	// No probe runs before the first period has elapsed.
	assert!(client
		.endpoint_statuses()
		.await
		.iter()
		.all(|status| status.last_check.is_none()));

	tokio::time::sleep(Duration::from_secs(11)).await;

	let statuses = client.endpoint_statuses().await;
	assert_eq!(statuses[0].health, EndpointHealth::Unhealthy);
	assert_eq!(statuses[1].health, EndpointHealth::Healthy);
	assert!(statuses.iter().all(|status| status.last_check.is_some()));

	// Requests skip the endpoint the probe found unhealthy.
	assert_eq!(
		client.chain_id(&CallContext::background()).await.unwrap(),
		"wes-mainnet"
	);
}

#[tokio::test]
async fn test_close_closes_every_client_and_collects_failures() {
	let mut first = MockBlockChainClient::new();
	first
		.expect_close()
		.times(1)
		.returning(|| Err(BlockChainError::connection_closed("already closed", None)));
	let mut second = MockBlockChainClient::new();
	second.expect_close().times(1).returning(|| Ok(()));

	let client = failover(vec![("first", first), ("second", second)], &config(3));

	match client.close().await {
		Err(BlockChainError::Close { errors, .. }) => assert_eq!(errors.len(), 1),
		other => panic!("unexpected result: {:?}", other),
	}
}

#[tokio::test]
async fn test_endpoints_are_ordered_by_priority() {
	let clients: Vec<(String, u32, SharedClient)> = vec![
		(
			"late".to_string(),
			9,
			Arc::new(MockBlockChainClient::new()) as SharedClient,
		),
		(
			"early".to_string(),
			1,
			Arc::new(MockBlockChainClient::new()) as SharedClient,
		),
	];
	let client = FallbackClient::with_clients(clients, &config(3)).unwrap();

	let names: Vec<String> = client
		.endpoint_statuses()
		.await
		.into_iter()
		.map(|status| status.name)
		.collect();
	assert_eq!(names, vec!["early".to_string(), "late".to_string()]);
}

#[tokio::test]
async fn test_construction_requires_a_request_endpoint() {
	let result = FallbackClient::with_clients(Vec::new(), &config(3));
	assert!(matches!(result, Err(BlockChainError::Config(_))));

	let streaming_only =
		ClientConfig::new(vec![Endpoint::new("stream", 0).with_streaming("ws://localhost:1")]);
	let result = FallbackClient::new(streaming_only);
	assert!(matches!(result, Err(BlockChainError::Config(_))));

	let invalid = ClientConfig::new(vec![Endpoint::new("bad", 0).with_primary("ftp://node")]);
	let result = FallbackClient::new(invalid);
	assert!(matches!(result, Err(BlockChainError::Config(_))));
}

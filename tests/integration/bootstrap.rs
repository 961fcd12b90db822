use std::{io::Write, sync::Arc, time::Duration};

use tempfile::NamedTempFile;

use chain_access::{
	bootstrap::{collect_status, initialize_client, load_client_config, select_streaming_endpoint},
	models::{ClientConfig, Endpoint, SyncStatus},
	services::blockchain::{
		BlockChainError, CallContext, EndpointHealth, FallbackClient, SharedClient,
	},
};

use crate::integration::mocks::MockBlockChainClient;

fn write_config(content: &str) -> NamedTempFile {
	let mut file = tempfile::Builder::new()
		.suffix(".json")
		.tempfile()
		.unwrap();
	file.write_all(content.as_bytes()).unwrap();
	file
}

#[test]
fn test_load_client_config_applies_defaults() {
	let file = write_config(
		r#"{
			"endpoints": [
				{"name": "a", "priority": 0, "primary_address": "http://localhost:8545"}
			],
			"timeout_ms": 1000
		}"#,
	);

	let config = load_client_config(file.path()).unwrap();

	assert_eq!(config.endpoints.len(), 1);
	assert_eq!(config.timeout, Duration::from_secs(1));
	assert_eq!(config.retry_attempts, 3);
	assert!(config.retry_backoff > Duration::ZERO);
}

#[test]
fn test_load_client_config_reports_the_path() {
	let file = write_config(r#"{"endpoints": [{"name": "a", "priority": 0}]}"#);

	let error = load_client_config(file.path()).unwrap_err();

	assert!(error
		.to_string()
		.contains(&file.path().display().to_string()));
}

#[test]
fn test_load_client_config_rejects_unknown_fields() {
	let file = write_config(
		r#"{
			"endpoints": [{"name": "a", "priority": 0, "primary_address": "http://localhost:8545"}],
			"timeout": 1000
		}"#,
	);

	assert!(load_client_config(file.path()).is_err());
}

#[tokio::test]
async fn test_initialize_client_builds_failover_client() {
	let config = ClientConfig::new(vec![
		Endpoint::new("rpc", 0).with_primary("http://localhost:8545"),
		Endpoint::new("stream", 1).with_streaming("ws://localhost:8546"),
	]);

	let client = initialize_client(config).unwrap();

	// Streaming-only endpoints take no part in request failover.
	let statuses = client.endpoint_statuses().await;
	assert_eq!(statuses.len(), 1);
	assert_eq!(statuses[0].name, "rpc");
}

#[tokio::test]
async fn test_collect_status_reads_chain_and_health() {
	let mut node = MockBlockChainClient::new();
	node.expect_chain_id()
		.times(1)
		.returning(|_| Ok("wes-devnet".to_string()));
	node.expect_block_number().times(1).returning(|_| Ok(1234));
	node.expect_syncing().times(1).returning(|_| {
		Ok(SyncStatus {
			syncing: true,
			starting_block: 1000,
			current_block: 1234,
			highest_block: 2000,
		})
	});

	let client: SharedClient = Arc::new(node);
	let config = ClientConfig::default().with_health_check_interval(Duration::from_secs(3600));
	let client =
		FallbackClient::with_clients(vec![("node".to_string(), 0, client)], &config).unwrap();

	let report = collect_status(&client, &CallContext::background())
		.await
		.unwrap();

	assert_eq!(report.chain_id, "wes-devnet");
	assert_eq!(report.head, 1234);
	assert!(report.sync.syncing);
	assert_eq!(report.sync.highest_block, 2000);
	assert_eq!(report.endpoints.len(), 1);
	assert_eq!(report.endpoints[0].health, EndpointHealth::Unknown);
}

#[tokio::test]
async fn test_collect_status_stops_at_first_failure() {
	let mut node = MockBlockChainClient::new();
	node.expect_chain_id()
		.times(1)
		.returning(|_| Err(BlockChainError::not_found("chain id")));

	let client: SharedClient = Arc::new(node);
	let config = ClientConfig::default().with_health_check_interval(Duration::from_secs(3600));
	let client =
		FallbackClient::with_clients(vec![("node".to_string(), 0, client)], &config).unwrap();

	let error = collect_status(&client, &CallContext::background())
		.await
		.unwrap_err();

	assert!(error.to_string().contains("chain id"));
}

#[test]
fn test_select_streaming_endpoint_requires_one() {
	let config = ClientConfig::new(vec![
		Endpoint::new("rpc", 0).with_primary("http://localhost:8545"),
	]);

	assert!(select_streaming_endpoint(&config, None).is_err());
}

use std::time::Duration;

use mockito::Server;
use serde_json::json;

use chain_access::{
	models::{Endpoint, SubscriptionType},
	services::blockchain::{
		create_client, create_subscription_client, BlockChainClient, BlockChainError, CallContext,
		WsConfig, JSONRPC_TRANSPORT, REST_TRANSPORT,
	},
	utils::HttpRetryConfig,
};

use crate::integration::mocks::TestWsServer;

async fn subscribe_transport(endpoint: &Endpoint) -> String {
	let client = create_client(endpoint, Duration::from_secs(1), &HttpRetryConfig::disabled())
		.unwrap();
	match client
		.subscribe(
			&CallContext::background(),
			SubscriptionType::NewHeads,
			None,
			None,
		)
		.await
	{
		Err(BlockChainError::Unsupported { transport, .. }) => transport,
		other => panic!("unexpected result: {:?}", other),
	}
}

#[tokio::test]
async fn test_primary_address_wins() {
	let endpoint = Endpoint::new("both", 0)
		.with_primary("http://localhost:8545")
		.with_secondary("http://localhost:8080");
	assert_eq!(subscribe_transport(&endpoint).await, JSONRPC_TRANSPORT);
}

#[tokio::test]
async fn test_secondary_address_is_used_alone() {
	let endpoint = Endpoint::new("rest", 0).with_secondary("http://localhost:8080");
	assert_eq!(subscribe_transport(&endpoint).await, REST_TRANSPORT);
}

#[tokio::test]
async fn test_created_rest_client_reaches_prefixed_api() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("GET", "/api/v1/chain/info")
		.with_status(200)
		.with_body(json!({"chainId": 1337}).to_string())
		.create_async()
		.await;

	let endpoint = Endpoint::new("rest", 0).with_secondary(server.url());
	let client =
		create_client(&endpoint, Duration::from_secs(5), &HttpRetryConfig::disabled()).unwrap();

	assert_eq!(
		client.chain_id(&CallContext::background()).await.unwrap(),
		"1337"
	);
	mock.assert_async().await;
}

#[tokio::test]
async fn test_subscription_client_connects_to_streaming_address() {
	let server = TestWsServer::start("0xsub").await;
	let endpoint = Endpoint::new("stream", 0).with_streaming(server.url());

	let client = create_subscription_client(&endpoint, WsConfig::new())
		.await
		.unwrap();

	assert!(client.is_connected());
	assert_eq!(client.url(), server.url());
	client.close().await.unwrap();
}

use std::time::Duration;

use mockito::{Matcher, Server};
use serde_json::json;

use chain_access::{
	models::{StateAnchor, SubscriptionType, TransferRequest},
	services::blockchain::{
		BlockChainClient, BlockChainError, CallContext, FailureDisposition, RestClient,
	},
	utils::HttpRetryConfig,
};

fn rest_client(url: &str) -> RestClient {
	RestClient::new(url, Duration::from_secs(5), &HttpRetryConfig::disabled()).unwrap()
}

#[tokio::test]
async fn test_requests_use_api_prefix() {
	let mut server = Server::new_async().await;
	let info = server
		.mock("GET", "/api/v1/chain/info")
		.with_status(200)
		.with_body(json!({"chain_id": "wes-mainnet", "version": "1.2.0"}).to_string())
		.create_async()
		.await;
	let head = server
		.mock("GET", "/api/v1/chain/head")
		.with_status(200)
		.with_body(json!({"height": "0x20", "hash": "0xhead"}).to_string())
		.create_async()
		.await;

	let client = rest_client(&server.url());
	let ctx = CallContext::background();

	assert_eq!(client.chain_id(&ctx).await.unwrap(), "wes-mainnet");
	assert_eq!(client.block_number(&ctx).await.unwrap(), 32);
	info.assert_async().await;
	head.assert_async().await;
}

#[tokio::test]
async fn test_prefixed_address_is_not_prefixed_twice() {
	let client = rest_client("http://node:8080/api/v1/");
	assert_eq!(client.base_url(), "http://node:8080/api/v1");
}

#[tokio::test]
async fn test_balance_anchor_becomes_query_parameters() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("GET", "/api/v1/accounts/0xabc/balance")
		.match_query(Matcher::AllOf(vec![
			Matcher::UrlEncoded("at_height".into(), "16".into()),
			Matcher::UrlEncoded("at_hash".into(), "0xbeef".into()),
		]))
		.with_status(200)
		.with_body(json!({"address": "0xabc", "balance": "0x64", "height": 16}).to_string())
		.create_async()
		.await;

	let client = rest_client(&server.url());
	let anchor = StateAnchor {
		height: Some(16),
		hash: Some("0xbeef".to_string()),
	};
	let balance = client
		.get_balance(&CallContext::background(), "0xabc", Some(anchor))
		.await
		.unwrap();

	assert_eq!(balance.balance, "100");
	assert_eq!(balance.height, 16);
	mock.assert_async().await;
}

#[tokio::test]
async fn test_send_raw_transaction_posts_signed_payload() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("POST", "/api/v1/transactions")
		.match_body(Matcher::Json(json!({"signed_tx": "0xsigned"})))
		.with_status(200)
		.with_body(json!({"tx_hash": "0xfeed", "accepted": true}).to_string())
		.create_async()
		.await;

	let client = rest_client(&server.url());
	let result = client
		.send_raw_transaction(&CallContext::background(), "0xsigned")
		.await
		.unwrap();

	assert!(result.accepted);
	assert_eq!(result.tx_hash, "0xfeed");
	mock.assert_async().await;
}

#[tokio::test]
async fn test_send_raw_transaction_rejection_is_a_result() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("POST", "/api/v1/transactions")
		.with_status(400)
		.with_body(json!({"error": "insufficient funds for transfer"}).to_string())
		.create_async()
		.await;

	let client = rest_client(&server.url());
	let result = client
		.send_raw_transaction(&CallContext::background(), "0xsigned")
		.await
		.unwrap();

	assert!(!result.accepted);
	assert!(result
		.reason
		.as_deref()
		.is_some_and(|reason| reason.contains("insufficient funds")));
	mock.assert_async().await;
}

#[tokio::test]
async fn test_send_raw_transaction_bad_request_stays_an_error() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("POST", "/api/v1/transactions")
		.with_status(400)
		.with_body("malformed payload")
		.create_async()
		.await;

	let client = rest_client(&server.url());
	let error = client
		.send_raw_transaction(&CallContext::background(), "0xsigned")
		.await
		.unwrap_err();

	assert!(matches!(error, BlockChainError::InvalidParams(_)));
	mock.assert_async().await;
}

#[tokio::test]
async fn test_anchored_balance_at_other_height_is_malformed() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("GET", "/api/v1/accounts/0xabc/balance")
		.match_query(Matcher::UrlEncoded("at_height".into(), "16".into()))
		.with_status(200)
		.with_body(json!({"balance": "0x64", "height": 17}).to_string())
		.create_async()
		.await;

	let client = rest_client(&server.url());
	let error = client
		.get_balance(
			&CallContext::background(),
			"0xabc",
			Some(StateAnchor::at_height(16)),
		)
		.await
		.unwrap_err();

	assert!(matches!(error, BlockChainError::MalformedResponse(_)));
	mock.assert_async().await;
}

#[tokio::test]
async fn test_anchored_balance_without_height_takes_anchor() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("GET", "/api/v1/accounts/0xabc/balance")
		.match_query(Matcher::UrlEncoded("at_height".into(), "16".into()))
		.with_status(200)
		.with_body(json!({"balance": "0x64"}).to_string())
		.create_async()
		.await;

	let client = rest_client(&server.url());
	let balance = client
		.get_balance(
			&CallContext::background(),
			"0xabc",
			Some(StateAnchor::at_height(16)),
		)
		.await
		.unwrap();

	assert_eq!(balance.address, "0xabc");
	assert_eq!(balance.height, 16);
	mock.assert_async().await;
}

#[tokio::test]
async fn test_status_codes_map_to_error_kinds() {
	let cases = vec![
		(404, FailureDisposition::Propagate),
		(400, FailureDisposition::Propagate),
		(501, FailureDisposition::Redirect),
		(502, FailureDisposition::Retry),
	];

	for (status, expected) in cases {
		let mut server = Server::new_async().await;
		let mock = server
			.mock("GET", "/api/v1/txpool/status")
			.with_status(status)
			.with_body("failure detail")
			.create_async()
			.await;

		let client = rest_client(&server.url());
		let error = client
			.txpool_status(&CallContext::background())
			.await
			.unwrap_err();

		assert_eq!(error.disposition(), expected, "status {}", status);
		if status == 404 {
			assert!(error.is_not_found());
		}
		mock.assert_async().await;
	}
}

#[tokio::test]
async fn test_empty_body_lookup_is_not_found() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("GET", "/api/v1/transactions/0xmissing")
		.with_status(200)
		.with_body("")
		.create_async()
		.await;

	let client = rest_client(&server.url());
	let error = client
		.get_transaction(&CallContext::background(), "0xmissing")
		.await
		.unwrap_err();

	assert!(error.is_not_found());
	mock.assert_async().await;
}

#[tokio::test]
async fn test_invalid_json_is_malformed() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("GET", "/api/v1/chain/syncing")
		.with_status(200)
		.with_body("<html>not json</html>")
		.create_async()
		.await;

	let client = rest_client(&server.url());
	let error = client
		.syncing(&CallContext::background())
		.await
		.unwrap_err();

	assert!(matches!(error, BlockChainError::MalformedResponse(_)));
	assert!(error.is_retryable());
	mock.assert_async().await;
}

#[tokio::test]
async fn test_ping_uses_health_resource() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("GET", "/api/v1/health")
		.with_status(200)
		.with_body(json!({"status": "ok"}).to_string())
		.create_async()
		.await;

	let client = rest_client(&server.url());
	client.ping(&CallContext::background()).await.unwrap();
	mock.assert_async().await;
}

#[tokio::test]
async fn test_operations_outside_the_api_are_unsupported() {
	let server = Server::new_async().await;
	let client = rest_client(&server.url());
	let ctx = CallContext::background();

	let transfer = TransferRequest {
		from: "0xa".to_string(),
		to: "0xb".to_string(),
		amount: "1".to_string(),
		fee: None,
	};
	let error = client.send_transaction(&ctx, &transfer).await.unwrap_err();
	assert!(error.is_unsupported());
	assert_eq!(error.disposition(), FailureDisposition::Redirect);

	let error = client
		.subscribe(&ctx, SubscriptionType::Logs, None, None)
		.await
		.unwrap_err();
	assert!(error.is_unsupported());

	let error = client
		.call_raw(&ctx, "wes_anything", json!([]))
		.await
		.unwrap_err();
	assert!(error.is_unsupported());
}

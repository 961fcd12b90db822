use std::time::Duration;

use mockito::{Matcher, Server};
use serde_json::json;

use chain_access::{
	models::{StateAnchor, SubscriptionType, TokenBalanceRequest},
	services::blockchain::{
		BlockChainClient, BlockChainError, CallContext, FailureDisposition, HttpTransportClient,
		JsonRpcClient, TransportError,
	},
	utils::HttpRetryConfig,
};

use crate::integration::mocks::MockJsonRpcTransport;

fn http_client(url: &str) -> JsonRpcClient<HttpTransportClient> {
	JsonRpcClient::new(url, Duration::from_secs(5), &HttpRetryConfig::disabled()).unwrap()
}

fn mock_client(
	method: &'static str,
	response: serde_json::Value,
) -> JsonRpcClient<MockJsonRpcTransport> {
	let mut transport = MockJsonRpcTransport::new();
	transport
		.expect_send_raw_request()
		.withf(move |requested, _| requested == method)
		.times(1)
		.returning(move |_, _| Ok(response.clone()));
	JsonRpcClient::new_with_transport(transport)
}

fn rpc_error(code: i64, message: &str) -> serde_json::Value {
	json!({
		"jsonrpc": "2.0",
		"id": 1,
		"error": {"code": code, "message": message}
	})
}

#[tokio::test]
async fn test_get_balance_decodes_hex_amount() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("POST", "/")
		.match_body(Matcher::PartialJson(json!({
			"jsonrpc": "2.0",
			"method": "wes_getBalance",
			"params": ["0xabc"]
		})))
		.with_status(200)
		.with_header("content-type", "application/json")
		.with_body(
			json!({
				"jsonrpc": "2.0",
				"id": 1,
				"result": {"address": "0xabc", "balance": "0x64", "height": "0x10"}
			})
			.to_string(),
		)
		.create_async()
		.await;

	let client = http_client(&server.url());
	let balance = client
		.get_balance(&CallContext::background(), "0xabc", None)
		.await
		.unwrap();

	assert_eq!(balance.address, "0xabc");
	assert_eq!(balance.balance, "100");
	assert_eq!(balance.height, 16);
	mock.assert_async().await;
}

#[tokio::test]
async fn test_state_anchor_is_forwarded() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("POST", "/")
		.match_body(Matcher::PartialJson(json!({
			"method": "wes_getBalance",
			"params": ["0xabc", {"blockHeight": "0x10", "blockHash": "0xbeef"}]
		})))
		.with_status(200)
		.with_body(
			json!({"jsonrpc": "2.0", "id": 1, "result": {"balance": "7", "height": 16}}).to_string(),
		)
		.expect(2)
		.create_async()
		.await;

	let client = http_client(&server.url());
	let anchor = StateAnchor {
		height: Some(16),
		hash: Some("0xbeef".to_string()),
	};
	let ctx = CallContext::background();

	let first = client
		.get_balance(&ctx, "0xabc", Some(anchor.clone()))
		.await
		.unwrap();
	let second = client.get_balance(&ctx, "0xabc", Some(anchor)).await.unwrap();

	assert_eq!(first, second);
	assert_eq!(first.balance, "7");
	mock.assert_async().await;
}

#[tokio::test]
async fn test_anchored_balance_fills_address_and_height() {
	let client = mock_client(
		"wes_getBalance",
		json!({"jsonrpc": "2.0", "id": 1, "result": {"balance": "0x64"}}),
	);

	let balance = client
		.get_balance(
			&CallContext::background(),
			"0xabc",
			Some(StateAnchor::at_height(100)),
		)
		.await
		.unwrap();

	assert_eq!(balance.address, "0xabc");
	assert_eq!(balance.balance, "100");
	assert_eq!(balance.height, 100);
}

#[tokio::test]
async fn test_anchored_balance_at_other_height_is_malformed() {
	let client = mock_client(
		"wes_getBalance",
		json!({"jsonrpc": "2.0", "id": 1, "result": {"balance": "0x64", "height": "0x63"}}),
	);

	let error = client
		.get_balance(
			&CallContext::background(),
			"0xabc",
			Some(StateAnchor::at_height(100)),
		)
		.await
		.unwrap_err();

	assert!(matches!(error, BlockChainError::MalformedResponse(_)));
	assert_eq!(error.disposition(), FailureDisposition::Retry);
}

#[tokio::test]
async fn test_anchored_token_balance_at_other_height_is_malformed() {
	let client = mock_client(
		"wes_getContractTokenBalance",
		json!({"jsonrpc": "2.0", "id": 1, "result": {"balance": "5", "height": 7}}),
	);
	let request = TokenBalanceRequest {
		address: "0xabc".to_string(),
		content_hash: "0xfeed".to_string(),
		token_id: None,
	};

	let error = client
		.get_contract_token_balance(
			&CallContext::background(),
			&request,
			Some(StateAnchor::at_height(8)),
		)
		.await
		.unwrap_err();

	assert!(matches!(error, BlockChainError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_block_at_other_height_is_malformed() {
	let client = mock_client(
		"wes_getBlockByHeight",
		json!({"jsonrpc": "2.0", "id": 1, "result": {"height": "0x9", "hash": "0xb"}}),
	);

	let error = client
		.get_block_by_height(&CallContext::background(), 10, false, None)
		.await
		.unwrap_err();

	assert!(matches!(error, BlockChainError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_close_runs_on_a_spawned_task() {
	let client = http_client("http://localhost:8545");
	let closed = tokio::spawn(async move { client.close().await }).await.unwrap();
	assert!(closed.is_ok());
}

#[tokio::test]
async fn test_http_error_without_envelope_is_retryable() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("POST", "/")
		.with_status(503)
		.with_body("upstream unavailable")
		.create_async()
		.await;

	let client = http_client(&server.url());
	let error = client
		.block_number(&CallContext::background())
		.await
		.unwrap_err();

	assert!(matches!(error, BlockChainError::Http { status: 503, .. }));
	assert_eq!(error.disposition(), FailureDisposition::Retry);
	mock.assert_async().await;
}

#[tokio::test]
async fn test_error_envelope_with_error_status_is_classified() {
	let mut server = Server::new_async().await;
	let mock = server
		.mock("POST", "/")
		.with_status(500)
		.with_body(rpc_error(-32601, "the method wes_txpool_status does not exist").to_string())
		.create_async()
		.await;

	let client = http_client(&server.url());
	let error = client
		.txpool_status(&CallContext::background())
		.await
		.unwrap_err();

	assert!(matches!(error, BlockChainError::MethodNotFound { .. }));
	assert_eq!(error.disposition(), FailureDisposition::Redirect);
	mock.assert_async().await;
}

#[tokio::test]
async fn test_rpc_error_classification() {
	let cases = vec![
		(-32601, "method not found", FailureDisposition::Redirect),
		(-32602, "invalid argument 0", FailureDisposition::Propagate),
		(-32000, "header not found", FailureDisposition::Retry),
		(-32000, "nonce too low", FailureDisposition::Propagate),
	];

	for (code, message, expected) in cases {
		let client = mock_client("wes_chainId", rpc_error(code, message));
		let error = client
			.chain_id(&CallContext::background())
			.await
			.unwrap_err();
		assert_eq!(error.disposition(), expected, "{} {}", code, message);
	}
}

#[tokio::test]
async fn test_business_rejection_is_returned_as_result() {
	let client = mock_client(
		"wes_sendRawTransaction",
		rpc_error(-32000, "insufficient funds for transfer"),
	);

	let result = client
		.send_raw_transaction(&CallContext::background(), "0xsigned")
		.await
		.unwrap();

	assert!(!result.accepted);
	assert!(result.tx_hash.is_empty());
	assert_eq!(
		result.reason.as_deref(),
		Some("insufficient funds for transfer")
	);
}

#[tokio::test]
async fn test_accepted_submission_returns_hash() {
	let client = mock_client(
		"wes_sendRawTransaction",
		json!({"jsonrpc": "2.0", "id": 1, "result": "0xfeed"}),
	);

	let result = client
		.send_raw_transaction(&CallContext::background(), "0xsigned")
		.await
		.unwrap();

	assert!(result.accepted);
	assert_eq!(result.tx_hash, "0xfeed");
}

#[tokio::test]
async fn test_null_lookup_is_not_found() {
	let client = mock_client(
		"wes_getTransactionByHash",
		json!({"jsonrpc": "2.0", "id": 1, "result": null}),
	);

	let error = client
		.get_transaction(&CallContext::background(), "0xmissing")
		.await
		.unwrap_err();

	assert!(error.is_not_found());
	assert_eq!(error.disposition(), FailureDisposition::Propagate);
}

#[tokio::test]
async fn test_envelope_without_result_is_malformed() {
	let client = mock_client("wes_blockNumber", json!({"jsonrpc": "2.0", "id": 1}));

	let error = client
		.block_number(&CallContext::background())
		.await
		.unwrap_err();

	assert!(matches!(error, BlockChainError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_transport_failure_is_network_error() {
	let mut transport = MockJsonRpcTransport::new();
	transport
		.expect_send_raw_request()
		.times(1)
		.returning(|_, _| Err(TransportError::network("connection refused", None, None)));
	let client = JsonRpcClient::new_with_transport(transport);

	let error = client.ping(&CallContext::background()).await.unwrap_err();

	assert!(matches!(error, BlockChainError::Network(_)));
	assert!(error.is_retryable());
}

#[tokio::test]
async fn test_invalid_input_fails_before_any_request() {
	// No expectation is set: any request would panic.
	let client = JsonRpcClient::new_with_transport(MockJsonRpcTransport::new());
	let ctx = CallContext::background();

	let error = client.get_balance(&ctx, "  ", None).await.unwrap_err();
	assert!(matches!(error, BlockChainError::InvalidParams(_)));

	let error = client.send_raw_transaction(&ctx, "").await.unwrap_err();
	assert!(matches!(error, BlockChainError::InvalidParams(_)));
}

#[tokio::test]
async fn test_subscribe_is_unsupported() {
	let client = JsonRpcClient::new_with_transport(MockJsonRpcTransport::new());

	let error = client
		.subscribe(
			&CallContext::background(),
			SubscriptionType::NewHeads,
			None,
			None,
		)
		.await
		.unwrap_err();

	assert!(error.is_unsupported());
	assert_eq!(error.disposition(), FailureDisposition::Redirect);
}

#[tokio::test]
async fn test_cancelled_context_stops_the_request() {
	let client = JsonRpcClient::new_with_transport(MockJsonRpcTransport::new());
	let ctx = CallContext::background();
	ctx.cancel();

	let error = client.chain_id(&ctx).await.unwrap_err();

	assert!(error.is_cancelled());
}

#[tokio::test]
async fn test_call_raw_returns_result_verbatim() {
	let client = mock_client(
		"wes_customMethod",
		json!({"jsonrpc": "2.0", "id": 1, "result": {"nested": [1, 2, 3]}}),
	);

	let result = client
		.call_raw(
			&CallContext::background(),
			"wes_customMethod",
			json!(["arg"]),
		)
		.await
		.unwrap();

	assert_eq!(result, json!({"nested": [1, 2, 3]}));
}

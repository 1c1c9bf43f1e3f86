use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{extract::Query, extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use eth_history_lookup::error::UpstreamError;
use eth_history_lookup::explorer::{EtherscanClient, LedgerIndex};
use eth_history_lookup::history::BlockRange;

type Seen = Arc<Mutex<Vec<HashMap<String, String>>>>;

async fn mock_etherscan(
    State(seen): State<Seen>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    seen.lock().unwrap().push(params.clone());
    if params.get("apikey").map(String::as_str) != Some("test-key") {
        return Json(json!({"status": "0", "message": "NOTOK", "result": "Invalid API Key"}));
    }

    let body = match (
        params.get("module").map(String::as_str),
        params.get("action").map(String::as_str),
    ) {
        (Some("proxy"), Some("eth_blockNumber")) => {
            json!({"jsonrpc": "2.0", "id": 83, "result": "0x1312d00"})
        }
        (Some("account"), Some("txlist")) => match params.get("startblock").map(String::as_str) {
            Some("0") => json!({
                "status": "1",
                "message": "OK",
                "result": [{
                    "blockNumber": "5",
                    "timeStamp": "1438918233",
                    "hash": "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060",
                    "from": "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed",
                    "to": "0x2c1ba59d6f58433fb1eaee7d20b26ed83bda51a3",
                    "value": "11901464239480000000000000",
                    "isError": "0"
                }]
            }),
            Some("100") => json!({"status": "0", "message": "No transactions found", "result": []}),
            _ => json!({"status": "0", "message": "NOTOK", "result": "Max rate limit reached"}),
        },
        (Some("block"), Some("getblocknobytime")) => match params.get("timestamp").map(String::as_str) {
            Some("1672531200") => json!({"status": "1", "message": "OK", "result": "16308189"}),
            _ => json!({"status": "0", "message": "NOTOK", "result": "Error! No closest block found"}),
        },
        _ => json!({"status": "0", "message": "NOTOK", "result": "Error! Missing Or invalid Module name"}),
    };
    Json(body)
}

async fn spawn_mock() -> (String, Seen, JoinHandle<()>) {
    let seen: Seen = Arc::default();
    let app = Router::new()
        .route("/api", get(mock_etherscan))
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let server = axum::serve(listener, app);
    let handle = tokio::spawn(async move {
        let _ = server.await;
    });
    (format!("http://{}/api", addr), seen, handle)
}

#[tokio::test]
async fn chain_head_parses_hex_result() {
    let (url, seen, handle) = spawn_mock().await;
    let client = EtherscanClient::new(&url, "test-key", Some(1), None).unwrap();

    assert_eq!(client.chain_head().await.unwrap(), 20_000_000);

    let params = seen.lock().unwrap()[0].clone();
    assert_eq!(params["chainid"], "1");
    assert_eq!(params["module"], "proxy");
    assert_eq!(params["action"], "eth_blockNumber");
    handle.abort();
}

#[tokio::test]
async fn chain_head_fails_on_bad_key() {
    let (url, _seen, handle) = spawn_mock().await;
    let client = EtherscanClient::new(&url, "wrong", None, None).unwrap();
    assert!(matches!(
        client.chain_head().await,
        Err(UpstreamError::Malformed { .. })
    ));
    handle.abort();
}

#[tokio::test]
async fn txlist_sends_window_and_parses_pages() {
    let (url, seen, handle) = spawn_mock().await;
    let client = EtherscanClient::new(&url, "test-key", None, None).unwrap();
    let address = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";

    let page = client
        .transactions_in_range(address, BlockRange { start: 0, end: 99 })
        .await
        .unwrap();
    assert_eq!(page.failure, None);
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].value, "11901464239480000000000000");

    let empty = client
        .transactions_in_range(address, BlockRange { start: 100, end: 199 })
        .await
        .unwrap();
    assert!(empty.records.is_empty());
    assert_eq!(empty.failure, None);

    let limited = client
        .transactions_in_range(address, BlockRange { start: 200, end: 299 })
        .await
        .unwrap();
    assert!(limited.records.is_empty());
    assert!(limited.failure.unwrap().contains("Max rate limit reached"));

    let params = seen.lock().unwrap()[0].clone();
    assert_eq!(params["module"], "account");
    assert_eq!(params["action"], "txlist");
    assert_eq!(params["address"], address);
    assert_eq!(params["startblock"], "0");
    assert_eq!(params["endblock"], "99");
    assert_eq!(params["sort"], "asc");
    assert!(!params.contains_key("chainid"));
    handle.abort();
}

#[tokio::test]
async fn block_lookup_uses_closest_before() {
    let (url, seen, handle) = spawn_mock().await;
    let client = EtherscanClient::new(&url, "test-key", Some(1), None).unwrap();

    assert_eq!(
        client.block_at_or_before(1_672_531_200).await.unwrap(),
        Some(16_308_189)
    );
    assert_eq!(client.block_at_or_before(0).await.unwrap(), None);

    let params = seen.lock().unwrap()[0].clone();
    assert_eq!(params["module"], "block");
    assert_eq!(params["action"], "getblocknobytime");
    assert_eq!(params["closest"], "before");
    handle.abort();
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = EtherscanClient::new(&format!("http://{}/api", addr), "test-key", None, None).unwrap();
    assert!(matches!(
        client.chain_head().await,
        Err(UpstreamError::Transport { .. })
    ));
}

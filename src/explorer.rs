use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::UpstreamError;
use crate::history::BlockRange;
use crate::models::RawTransaction;

const SERVICE: &str = "indexing api";
const NO_TRANSACTIONS: &str = "No transactions found";

/// One `txlist` page. `failure` carries the provider's message when the page
/// came back with a non-success status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxPage {
    pub records: Vec<RawTransaction>,
    pub failure: Option<String>,
}

impl TxPage {
    pub fn ok(records: Vec<RawTransaction>) -> Self {
        Self {
            records,
            failure: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            records: Vec::new(),
            failure: Some(message.into()),
        }
    }
}

/// Read access to a block-explorer style ledger index.
pub trait LedgerIndex: Send + Sync {
    /// Highest block the index knows about.
    fn chain_head(&self) -> impl Future<Output = Result<u64, UpstreamError>> + Send;

    /// Transactions touching `address` within `range`, ascending.
    fn transactions_in_range(
        &self,
        address: &str,
        range: BlockRange,
    ) -> impl Future<Output = Result<TxPage, UpstreamError>> + Send;

    /// Closest block at or before `timestamp`, `None` if the index has none.
    fn block_at_or_before(
        &self,
        timestamp: i64,
    ) -> impl Future<Output = Result<Option<u64>, UpstreamError>> + Send;
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: Value,
}

#[derive(Clone)]
pub struct EtherscanClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    chain_id: Option<u64>,
}

impl EtherscanClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        chain_id: Option<u64>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder().no_proxy();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("failed to build reqwest client")?;
        let base_url = Url::parse(base_url).context("invalid ETHERSCAN_API_URL")?;
        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
            chain_id,
        })
    }

    async fn get(
        &self,
        module: &str,
        action: &str,
        params: &[(&str, String)],
    ) -> Result<Value, UpstreamError> {
        let mut request = self.http.get(self.base_url.clone());
        if let Some(chain_id) = self.chain_id {
            request = request.query(&[("chainid", chain_id.to_string())]);
        }
        let response = request
            .query(&[("module", module), ("action", action)])
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                service: SERVICE,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Rejected {
                service: SERVICE,
                message: format!("{module}/{action} returned HTTP {status}"),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|source| UpstreamError::Transport {
                service: SERVICE,
                source,
            })
    }

    async fn get_envelope(
        &self,
        module: &str,
        action: &str,
        params: &[(&str, String)],
    ) -> Result<Envelope, UpstreamError> {
        let body = self.get(module, action, params).await?;
        serde_json::from_value(body)
            .map_err(|e| UpstreamError::malformed(SERVICE, format!("{module}/{action}: {e}")))
    }
}

impl LedgerIndex for EtherscanClient {
    async fn chain_head(&self) -> Result<u64, UpstreamError> {
        let body = self.get("proxy", "eth_blockNumber", &[]).await?;
        parse_block_number(&body)
    }

    async fn transactions_in_range(
        &self,
        address: &str,
        range: BlockRange,
    ) -> Result<TxPage, UpstreamError> {
        let params = [
            ("address", address.to_string()),
            ("startblock", range.start.to_string()),
            ("endblock", range.end.to_string()),
            ("sort", "asc".to_string()),
        ];
        let envelope = self.get_envelope("account", "txlist", &params).await?;
        parse_tx_page(envelope)
    }

    async fn block_at_or_before(&self, timestamp: i64) -> Result<Option<u64>, UpstreamError> {
        let params = [
            ("timestamp", timestamp.to_string()),
            ("closest", "before".to_string()),
        ];
        let envelope = self.get_envelope("block", "getblocknobytime", &params).await?;
        parse_block_lookup(envelope)
    }
}

fn parse_block_number(body: &Value) -> Result<u64, UpstreamError> {
    let result = body
        .get("result")
        .and_then(Value::as_str)
        .ok_or_else(|| UpstreamError::malformed(SERVICE, format!("eth_blockNumber: {body}")))?;
    let digits = result
        .strip_prefix("0x")
        .or_else(|| result.strip_prefix("0X"))
        .unwrap_or(result);
    u64::from_str_radix(digits, 16)
        .map_err(|_| UpstreamError::malformed(SERVICE, format!("eth_blockNumber: {result:?}")))
}

fn parse_tx_page(envelope: Envelope) -> Result<TxPage, UpstreamError> {
    if envelope.status == "1" {
        let records = serde_json::from_value::<Vec<RawTransaction>>(envelope.result)
            .map_err(|e| UpstreamError::malformed(SERVICE, format!("txlist: {e}")))?;
        return Ok(TxPage::ok(records));
    }

    let empty_result = envelope
        .result
        .as_array()
        .map(|items| items.is_empty())
        .unwrap_or(false);
    if empty_result && envelope.message.starts_with(NO_TRANSACTIONS) {
        return Ok(TxPage::ok(Vec::new()));
    }

    Ok(TxPage::failed(describe_failure(&envelope)))
}

fn parse_block_lookup(envelope: Envelope) -> Result<Option<u64>, UpstreamError> {
    if envelope.status != "1" {
        tracing::warn!("getblocknobytime failed: {}", describe_failure(&envelope));
        return Ok(None);
    }
    let height = match &envelope.result {
        Value::String(s) => s.parse::<u64>().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    };
    height.map(Some).ok_or_else(|| {
        UpstreamError::malformed(SERVICE, format!("getblocknobytime: {}", envelope.result))
    })
}

fn describe_failure(envelope: &Envelope) -> String {
    match envelope.result.as_str() {
        Some(detail) if !detail.is_empty() => format!("{} ({detail})", envelope.message),
        _ => envelope.message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: Value) -> Envelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn block_number_is_hex() {
        let body = json!({"jsonrpc": "2.0", "id": 83, "result": "0x10d4f"});
        assert_eq!(parse_block_number(&body).unwrap(), 68943);
        assert_eq!(parse_block_number(&json!({"result": "10d4f"})).unwrap(), 68943);
    }

    #[test]
    fn block_number_error_text_is_malformed() {
        let body = json!({"status": "0", "message": "NOTOK", "result": "Invalid API Key"});
        assert!(matches!(
            parse_block_number(&body),
            Err(UpstreamError::Malformed { .. })
        ));
        assert!(parse_block_number(&json!({})).is_err());
        assert!(parse_block_number(&json!({"result": "0x"})).is_err());
    }

    #[test]
    fn no_transactions_is_an_empty_page() {
        let page = parse_tx_page(envelope(json!({
            "status": "0",
            "message": "No transactions found",
            "result": []
        })))
        .unwrap();
        assert_eq!(page, TxPage::ok(Vec::new()));
    }

    #[test]
    fn rate_limit_is_a_failed_page() {
        let page = parse_tx_page(envelope(json!({
            "status": "0",
            "message": "NOTOK",
            "result": "Max rate limit reached"
        })))
        .unwrap();
        assert!(page.records.is_empty());
        assert_eq!(page.failure.as_deref(), Some("NOTOK (Max rate limit reached)"));
    }

    #[test]
    fn success_page_parses_records() {
        let page = parse_tx_page(envelope(json!({
            "status": "1",
            "message": "OK",
            "result": [{
                "blockNumber": "14923678",
                "hash": "0xabc",
                "from": "0x1",
                "to": "",
                "value": "0",
                "gas": "21000"
            }]
        })))
        .unwrap();
        assert_eq!(page.failure, None);
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].block_number, "14923678");
        assert_eq!(page.records[0].to, "");
    }

    #[test]
    fn block_lookup_failure_is_none() {
        let lookup = parse_block_lookup(envelope(json!({
            "status": "0",
            "message": "NOTOK",
            "result": "Error! No closest block found"
        })))
        .unwrap();
        assert_eq!(lookup, None);

        let found = parse_block_lookup(envelope(json!({
            "status": "1",
            "message": "OK",
            "result": "16308189"
        })))
        .unwrap();
        assert_eq!(found, Some(16308189));
    }
}

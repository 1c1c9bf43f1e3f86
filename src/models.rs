use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Transaction as listed by the indexing API (`account/txlist`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    pub hash: String,
    pub from: String,
    #[serde(default)]
    pub to: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TxKind {
    #[serde(rename = "ETH Transfer")]
    NativeTransfer,
    #[serde(rename = "Contract Interaction")]
    ContractInteraction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub block_number: u64,
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub value_wei: String,
    pub value: f64,
    pub kind: TxKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FetchStats {
    pub windows: usize,
    pub failed_windows: usize,
    pub skipped_records: usize,
    pub last_window_end: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionHistory {
    pub head: u64,
    pub transactions: Vec<TransactionRecord>,
    pub stats: FetchStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceSnapshot {
    pub block: u64,
    pub native_balance: f64,
    pub token_balances: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceReport {
    pub address: String,
    pub date: String,
    pub timestamp: i64,
    #[serde(flatten)]
    pub snapshot: BalanceSnapshot,
}

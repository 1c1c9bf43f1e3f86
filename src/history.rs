use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::cancel::CancelFlag;
use crate::error::{HistoryError, UpstreamError};
use crate::explorer::LedgerIndex;
use crate::models::{FetchStats, RawTransaction, TransactionHistory, TransactionRecord, TxKind};
use crate::units::{self, UnitsError};

pub const DEFAULT_STEP: u64 = 10_000;
pub const DEFAULT_DELAY: Duration = Duration::from_millis(200);

/// Closed interval of block heights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockRange {
    pub start: u64,
    pub end: u64,
}

/// What to do when the index fails to serve one block window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WindowFailurePolicy {
    /// Log the failure, drop the window and continue with the next one.
    #[default]
    Skip,
    /// Stop the whole fetch with [`HistoryError::Window`].
    Abort,
}

#[derive(Debug, Clone)]
pub struct HistoryOptions {
    pub step: u64,
    pub delay: Duration,
    pub deadline: Option<Duration>,
    pub on_window_failure: WindowFailurePolicy,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            step: DEFAULT_STEP,
            delay: DEFAULT_DELAY,
            deadline: None,
            on_window_failure: WindowFailurePolicy::Skip,
        }
    }
}

/// Consecutive windows of `step` blocks covering `start..=head`; the last one
/// is clipped to `head`.
pub fn block_windows(start: u64, head: u64, step: u64) -> BlockWindows {
    BlockWindows {
        next: (start <= head).then_some(start),
        head,
        step: step.max(1),
    }
}

#[derive(Debug, Clone)]
pub struct BlockWindows {
    next: Option<u64>,
    head: u64,
    step: u64,
}

impl Iterator for BlockWindows {
    type Item = BlockRange;

    fn next(&mut self) -> Option<BlockRange> {
        let start = self.next?;
        let end = start.saturating_add(self.step - 1).min(self.head);
        self.next = if end < self.head { Some(end + 1) } else { None };
        Some(BlockRange { start, end })
    }
}

/// Fetches every transaction of `address` from `start_block` up to the chain
/// head, one window at a time. The head is resolved once, up front.
pub async fn fetch_transactions<I: LedgerIndex>(
    index: &I,
    address: &str,
    start_block: u64,
    options: &HistoryOptions,
    cancel: &CancelFlag,
) -> Result<TransactionHistory, HistoryError> {
    let address = crate::address::validate(address)
        .map(|a| format!("0x{:x}", a))
        .map_err(|e| HistoryError::InvalidAddress(e.to_string()))?;

    let head = index.chain_head().await.map_err(HistoryError::ChainHead)?;
    let deadline = options.deadline.map(|d| Instant::now() + d);

    let mut transactions = Vec::new();
    let mut stats = FetchStats::default();

    if start_block > head {
        tracing::info!("start block {} is past chain head {}", start_block, head);
        return Ok(TransactionHistory {
            head,
            transactions,
            stats,
        });
    }

    tracing::info!(
        "fetching transactions for {} from block {} to {}",
        address,
        start_block,
        head
    );

    let mut windows = block_windows(start_block, head, options.step).peekable();
    while let Some(range) = windows.next() {
        check_interrupted(cancel, deadline, transactions.len(), range.start)?;

        match index.transactions_in_range(&address, range).await {
            Ok(page) => match page.failure {
                None => {
                    let fetched = page.records.len();
                    for raw in page.records {
                        match normalize_tx(&raw) {
                            Ok(record) => transactions.push(record),
                            Err(e) => {
                                stats.skipped_records += 1;
                                tracing::warn!("skipping transaction {}: {}", raw.hash, e);
                            }
                        }
                    }
                    tracing::info!(
                        "Fetched {} txs from blocks {} to {}",
                        fetched,
                        range.start,
                        range.end
                    );
                }
                Some(message) => {
                    let source = UpstreamError::Rejected {
                        service: "indexing api",
                        message,
                    };
                    handle_window_failure(options, &mut stats, range, source)?;
                }
            },
            Err(source) => handle_window_failure(options, &mut stats, range, source)?,
        }

        stats.windows += 1;
        stats.last_window_end = Some(range.end);

        if let Some(next) = windows.peek() {
            if !options.delay.is_zero() {
                check_interrupted(cancel, deadline, transactions.len(), next.start)?;
                tokio::time::sleep(options.delay).await;
            }
        }
    }

    tracing::info!(
        "fetched {} transactions in {} windows ({} failed)",
        transactions.len(),
        stats.windows,
        stats.failed_windows
    );

    Ok(TransactionHistory {
        head,
        transactions,
        stats,
    })
}

fn handle_window_failure(
    options: &HistoryOptions,
    stats: &mut FetchStats,
    range: BlockRange,
    source: UpstreamError,
) -> Result<(), HistoryError> {
    tracing::error!(
        "Error fetching transactions for block range {} - {}: {}",
        range.start,
        range.end,
        source
    );
    stats.failed_windows += 1;
    match options.on_window_failure {
        WindowFailurePolicy::Skip => Ok(()),
        WindowFailurePolicy::Abort => Err(HistoryError::Window { range, source }),
    }
}

fn check_interrupted(
    cancel: &CancelFlag,
    deadline: Option<Instant>,
    fetched: usize,
    next_block: u64,
) -> Result<(), HistoryError> {
    if cancel.is_cancelled() {
        tracing::warn!("fetch cancelled before block {}", next_block);
        return Err(HistoryError::Cancelled {
            fetched,
            next_block,
        });
    }
    if deadline.is_some_and(|d| Instant::now() >= d) {
        tracing::warn!("fetch deadline reached before block {}", next_block);
        return Err(HistoryError::DeadlineExceeded {
            fetched,
            next_block,
        });
    }
    Ok(())
}

pub fn normalize_tx(raw: &RawTransaction) -> Result<TransactionRecord, UnitsError> {
    let block_number = raw
        .block_number
        .trim()
        .parse::<u64>()
        .map_err(|_| UnitsError::InvalidAmount(raw.block_number.clone()))?;
    let wei = units::parse_base_units(&raw.value)?;
    let kind = if wei.is_zero() {
        TxKind::ContractInteraction
    } else {
        TxKind::NativeTransfer
    };

    Ok(TransactionRecord {
        block_number,
        hash: raw.hash.clone(),
        from: raw.from.clone(),
        to: (!raw.to.is_empty()).then(|| raw.to.clone()),
        value_wei: wei.to_string(),
        value: units::wei_to_ether(wei)?,
        kind,
    })
}

use crate::history::BlockRange;
use crate::units::UnitsError;

/// Failure talking to the indexing API or the node.
#[derive(thiserror::Error, Debug)]
pub enum UpstreamError {
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("malformed {service} response: {detail}")]
    Malformed {
        service: &'static str,
        detail: String,
    },
    #[error("{service} rejected request: {message}")]
    Rejected {
        service: &'static str,
        message: String,
    },
    #[error("node rpc error: {0}")]
    Node(#[from] ethers_providers::ProviderError),
    #[error("undecodable contract return data: {0}")]
    Decode(String),
    #[error(transparent)]
    Units(#[from] UnitsError),
}

impl UpstreamError {
    pub(crate) fn malformed(service: &'static str, detail: impl Into<String>) -> Self {
        Self::Malformed {
            service,
            detail: detail.into(),
        }
    }
}

/// Outcome of the historical balance flow when no snapshot could be produced.
#[derive(thiserror::Error, Debug)]
pub enum LookupError {
    #[error("Invalid Ethereum address: {0}")]
    InvalidAddress(String),
    #[error("Invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Unable to find a block for {date}")]
    NoBlockFound { date: String },
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

#[derive(thiserror::Error, Debug)]
pub enum HistoryError {
    #[error("Invalid Ethereum address: {0}")]
    InvalidAddress(String),
    #[error("failed to resolve chain head: {0}")]
    ChainHead(#[source] UpstreamError),
    #[error("failed to fetch blocks {}..={}: {source}", .range.start, .range.end)]
    Window {
        range: BlockRange,
        #[source]
        source: UpstreamError,
    },
    #[error("fetch cancelled after {fetched} transactions, next block {next_block}")]
    Cancelled { fetched: usize, next_block: u64 },
    #[error("fetch deadline exceeded after {fetched} transactions, next block {next_block}")]
    DeadlineExceeded { fetched: usize, next_block: u64 },
}

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::balance;
use crate::cancel::CancelFlag;
use crate::error::{HistoryError, LookupError};
use crate::explorer::LedgerIndex;
use crate::history::{self, HistoryOptions};
use crate::models::{BalanceReport, FetchStats, TransactionRecord};
use crate::node::BalanceSource;
use crate::tokens::TokenDescriptor;

pub struct AppState<I, N> {
    pub index: Arc<I>,
    pub node: Arc<N>,
    pub tokens: Arc<Vec<TokenDescriptor>>,
    pub history: Arc<HistoryOptions>,
}

impl<I, N> AppState<I, N> {
    pub fn new(index: I, node: N, tokens: Vec<TokenDescriptor>, history: HistoryOptions) -> Self {
        Self {
            index: Arc::new(index),
            node: Arc::new(node),
            tokens: Arc::new(tokens),
            history: Arc::new(history),
        }
    }
}

impl<I, N> Clone for AppState<I, N> {
    fn clone(&self) -> Self {
        Self {
            index: Arc::clone(&self.index),
            node: Arc::clone(&self.node),
            tokens: Arc::clone(&self.tokens),
            history: Arc::clone(&self.history),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub address: String,
    pub start_block: u64,
}

#[derive(Serialize)]
struct HistoryResponse {
    address: String,
    start_block: u64,
    head: u64,
    transactions: Vec<TransactionRecord>,
    stats: FetchStats,
}

async fn get_transactions<I, N>(
    State(state): State<AppState<I, N>>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<HistoryResponse>, ApiError>
where
    I: LedgerIndex + 'static,
    N: BalanceSource + 'static,
{
    let Query(query) = query?;
    // the request future being dropped is the only other way to stop a fetch
    let cancel = CancelFlag::new();
    let history = history::fetch_transactions(
        state.index.as_ref(),
        &query.address,
        query.start_block,
        &state.history,
        &cancel,
    )
    .await?;

    Ok(Json(HistoryResponse {
        address: query.address,
        start_block: query.start_block,
        head: history.head,
        transactions: history.transactions,
        stats: history.stats,
    }))
}

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    pub address: String,
    pub date: String,
}

async fn get_balance<I, N>(
    State(state): State<AppState<I, N>>,
    query: Result<Query<BalanceQuery>, QueryRejection>,
) -> Result<Json<BalanceReport>, ApiError>
where
    I: LedgerIndex + 'static,
    N: BalanceSource + 'static,
{
    let Query(query) = query?;
    let report = balance::historical_balance(
        state.index.as_ref(),
        state.node.as_ref(),
        &state.tokens,
        &query.address,
        &query.date,
    )
    .await?;
    Ok(Json(report))
}

pub fn app_router<I, N>(state: AppState<I, N>) -> Router
where
    I: LedgerIndex + 'static,
    N: BalanceSource + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/transactions", get(get_transactions::<I, N>))
        .route("/balance", get(get_balance::<I, N>))
        .with_state(state)
}

pub async fn run_http_server<I, N>(addr: &str, state: AppState<I, N>) -> Result<()>
where
    I: LedgerIndex + 'static,
    N: BalanceSource + 'static,
{
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Error body returned by every endpoint: `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: rejection.body_text(),
        }
    }
}

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        let status = match &err {
            LookupError::InvalidAddress(_) | LookupError::InvalidDate(_) => StatusCode::BAD_REQUEST,
            LookupError::NoBlockFound { .. } => StatusCode::NOT_FOUND,
            LookupError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        if status.is_server_error() {
            tracing::error!("balance lookup failed: {}", err);
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<HistoryError> for ApiError {
    fn from(err: HistoryError) -> Self {
        let status = match &err {
            HistoryError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
            HistoryError::ChainHead(_) | HistoryError::Window { .. } => StatusCode::BAD_GATEWAY,
            HistoryError::Cancelled { .. } | HistoryError::DeadlineExceeded { .. } => {
                StatusCode::GATEWAY_TIMEOUT
            }
        };
        if status.is_server_error() {
            tracing::error!("transaction history failed: {}", err);
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

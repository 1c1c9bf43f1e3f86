use std::collections::BTreeMap;

use chrono::NaiveDate;
use ethers_core::types::Address;

use crate::address;
use crate::error::{LookupError, UpstreamError};
use crate::explorer::LedgerIndex;
use crate::models::{BalanceReport, BalanceSnapshot};
use crate::node::BalanceSource;
use crate::tokens::TokenDescriptor;
use crate::units;

/// Unix timestamp of 00:00:00 UTC on `date` (`YYYY-MM-DD`).
pub fn utc_midnight_timestamp(date: &str) -> Result<i64, LookupError> {
    let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| LookupError::InvalidDate(date.to_string()))?;
    let midnight = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| LookupError::InvalidDate(date.to_string()))?;
    Ok(midnight.and_utc().timestamp())
}

/// Block closest to, and not after, midnight UTC of `date`.
pub async fn resolve_block<I: LedgerIndex>(
    index: &I,
    date: &str,
) -> Result<Option<u64>, LookupError> {
    let timestamp = utc_midnight_timestamp(date)?;
    Ok(index.block_at_or_before(timestamp).await?)
}

/// Native and token balances of `owner` as of `block`. Token lookups are
/// isolated: a failing or empty token is left out of the snapshot.
pub async fn read_balances<N: BalanceSource>(
    node: &N,
    tokens: &[TokenDescriptor],
    owner: Address,
    block: u64,
) -> Result<BalanceSnapshot, UpstreamError> {
    let wei = node.native_balance(owner, block).await?;
    let native_balance = units::wei_to_ether(wei)?;

    let mut token_balances = BTreeMap::new();
    for token in tokens {
        match read_token(node, token, owner, block).await {
            Ok(Some((symbol, amount))) => {
                token_balances.insert(symbol, amount);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!("Error while fetching token {}: {}", token.symbol, e);
            }
        }
    }

    Ok(BalanceSnapshot {
        block,
        native_balance,
        token_balances,
    })
}

async fn read_token<N: BalanceSource>(
    node: &N,
    token: &TokenDescriptor,
    owner: Address,
    block: u64,
) -> Result<Option<(String, f64)>, UpstreamError> {
    let raw = node.token_balance(token.address, owner, block).await?;
    let decimals = node.token_decimals(token.address, block).await?;
    let symbol = node.token_symbol(token.address, block).await?;
    let amount = units::to_decimal(raw, decimals)?;
    Ok((amount > 0.0).then_some((symbol, amount)))
}

/// Balance of `address` at the start of `date`: validate, resolve the block,
/// then read balances. Nothing is requested if either input is invalid.
pub async fn historical_balance<I: LedgerIndex, N: BalanceSource>(
    index: &I,
    node: &N,
    tokens: &[TokenDescriptor],
    address: &str,
    date: &str,
) -> Result<BalanceReport, LookupError> {
    let owner = address::validate(address)
        .map_err(|e| LookupError::InvalidAddress(e.to_string()))?;
    let timestamp = utc_midnight_timestamp(date)?;

    let block = index
        .block_at_or_before(timestamp)
        .await?
        .ok_or_else(|| LookupError::NoBlockFound {
            date: date.to_string(),
        })?;
    tracing::info!("resolved {} to block {}", date, block);

    let snapshot = read_balances(node, tokens, owner, block).await?;

    Ok(BalanceReport {
        address: address::checksummed(&owner),
        date: date.to_string(),
        timestamp,
        snapshot,
    })
}

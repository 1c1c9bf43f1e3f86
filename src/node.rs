use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use ethers_core::abi::{self, ParamType, Token};
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Address, BlockId, Bytes, TransactionRequest, U256};
use ethers_core::utils::id;
use ethers_providers::{Http, Middleware, Provider};
use url::Url;

use crate::error::UpstreamError;

/// Historical account state served by a JSON-RPC node.
pub trait BalanceSource: Send + Sync {
    /// Native balance in wei at `block`.
    fn native_balance(
        &self,
        owner: Address,
        block: u64,
    ) -> impl Future<Output = Result<U256, UpstreamError>> + Send;

    /// ERC-20 `balanceOf(owner)` at `block`.
    fn token_balance(
        &self,
        token: Address,
        owner: Address,
        block: u64,
    ) -> impl Future<Output = Result<U256, UpstreamError>> + Send;

    fn token_decimals(
        &self,
        token: Address,
        block: u64,
    ) -> impl Future<Output = Result<u32, UpstreamError>> + Send;

    fn token_symbol(
        &self,
        token: Address,
        block: u64,
    ) -> impl Future<Output = Result<String, UpstreamError>> + Send;
}

#[derive(Clone)]
pub struct NodeClient {
    provider: Provider<Http>,
}

impl NodeClient {
    pub fn new(rpc_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().no_proxy();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("failed to build reqwest client")?;
        let url = Url::parse(rpc_url).context("invalid node endpoint url")?;
        let transport = Http::new_with_client(url, client);
        let provider = Provider::new(transport);
        Ok(Self { provider })
    }

    async fn call(
        &self,
        contract: Address,
        data: Bytes,
        block: u64,
    ) -> Result<Bytes, UpstreamError> {
        let tx: TypedTransaction = TransactionRequest::new().to(contract).data(data).into();
        let out = self.provider.call(&tx, Some(at_block(block))).await?;
        Ok(out)
    }
}

impl BalanceSource for NodeClient {
    async fn native_balance(&self, owner: Address, block: u64) -> Result<U256, UpstreamError> {
        let balance = self
            .provider
            .get_balance(owner, Some(at_block(block)))
            .await?;
        Ok(balance)
    }

    async fn token_balance(
        &self,
        token: Address,
        owner: Address,
        block: u64,
    ) -> Result<U256, UpstreamError> {
        let out = self.call(token, balance_of_calldata(owner), block).await?;
        decode_uint(&out, 256)
    }

    async fn token_decimals(&self, token: Address, block: u64) -> Result<u32, UpstreamError> {
        let out = self.call(token, calldata("decimals()", &[]), block).await?;
        let decimals = decode_uint(&out, 8)?;
        if decimals > U256::from(u8::MAX) {
            return Err(UpstreamError::Decode(format!("decimals() returned {decimals}")));
        }
        Ok(decimals.as_u32())
    }

    async fn token_symbol(&self, token: Address, block: u64) -> Result<String, UpstreamError> {
        let out = self.call(token, calldata("symbol()", &[]), block).await?;
        decode_string(&out)
    }
}

fn at_block(block: u64) -> BlockId {
    BlockId::Number(block.into())
}

/// Four-byte selector followed by the ABI-encoded arguments.
pub fn calldata(signature: &str, args: &[Token]) -> Bytes {
    let mut data = id(signature).to_vec();
    data.extend(abi::encode(args));
    data.into()
}

pub fn balance_of_calldata(owner: Address) -> Bytes {
    calldata("balanceOf(address)", &[Token::Address(owner)])
}

fn decode_uint(data: &[u8], bits: usize) -> Result<U256, UpstreamError> {
    abi::decode(&[ParamType::Uint(bits)], data)
        .map_err(|e| UpstreamError::Decode(e.to_string()))?
        .into_iter()
        .next()
        .and_then(Token::into_uint)
        .ok_or_else(|| UpstreamError::Decode("expected uint return value".to_string()))
}

fn decode_string(data: &[u8]) -> Result<String, UpstreamError> {
    abi::decode(&[ParamType::String], data)
        .map_err(|e| UpstreamError::Decode(e.to_string()))?
        .into_iter()
        .next()
        .and_then(Token::into_string)
        .ok_or_else(|| UpstreamError::Decode("expected string return value".to_string()))
}

use std::env;
use std::time::Duration;

use crate::history::{HistoryOptions, WindowFailurePolicy, DEFAULT_DELAY, DEFAULT_STEP};
use crate::tokens::{default_tokens, parse_token_list, TokenDescriptor, TokenListError};

const DEFAULT_ETHERSCAN_API_URL: &str = "https://api.etherscan.io/v2/api";
const DEFAULT_NODE_BASE_URL: &str = "https://tiniest-quaint-mansion.quiknode.pro";

#[derive(Debug, Clone)]
pub struct Config {
    pub etherscan_api_key: String,
    pub etherscan_api_url: String,
    pub etherscan_chain_id: Option<u64>,
    /// Only `balance` and `serve` need it; see [`Config::node_endpoint`].
    pub eth_rpc_url: Option<String>,
    pub http_bind_addr: String,
    pub http_timeout: Option<Duration>,
    pub history: HistoryOptions,
    pub tokens: Vec<TokenDescriptor>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("missing ETHERSCAN_API_KEY env var")]
    MissingEtherscanApiKey,
    #[error("missing node endpoint: set ETH_RPC_URL or PROJECT_ID")]
    MissingNodeEndpoint,
    #[error("{name}={value:?} is not a valid number")]
    InvalidNumber { name: &'static str, value: String },
    #[error("HISTORY_STEP must be greater than zero")]
    ZeroStep,
    #[error("HISTORY_ON_WINDOW_FAILURE must be `skip` or `abort`, got {0:?}")]
    InvalidWindowPolicy(String),
    #[error("invalid TOKENS: {0}")]
    InvalidTokens(#[from] TokenListError),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let etherscan_api_key =
            var("ETHERSCAN_API_KEY").ok_or(ConfigError::MissingEtherscanApiKey)?;
        let etherscan_api_url =
            var("ETHERSCAN_API_URL").unwrap_or_else(|| DEFAULT_ETHERSCAN_API_URL.to_string());
        let etherscan_chain_id =
            parse_number("ETHERSCAN_CHAIN_ID", var("ETHERSCAN_CHAIN_ID"))?.or(Some(1));

        let eth_rpc_url = var("ETH_RPC_URL").or_else(|| {
            var("PROJECT_ID").map(|project_id| {
                let base =
                    var("NODE_BASE_URL").unwrap_or_else(|| DEFAULT_NODE_BASE_URL.to_string());
                format!("{}/{}", base.trim_end_matches('/'), project_id)
            })
        });

        let http_bind_addr = var("HTTP_BIND").unwrap_or_else(|| "127.0.0.1:8080".to_string());
        let http_timeout =
            parse_number("HTTP_TIMEOUT_SECS", var("HTTP_TIMEOUT_SECS"))?.map(Duration::from_secs);

        let step = parse_number("HISTORY_STEP", var("HISTORY_STEP"))?.unwrap_or(DEFAULT_STEP);
        if step == 0 {
            return Err(ConfigError::ZeroStep);
        }
        let delay = parse_number("HISTORY_DELAY_MS", var("HISTORY_DELAY_MS"))?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_DELAY);
        let deadline = parse_number("HISTORY_DEADLINE_SECS", var("HISTORY_DEADLINE_SECS"))?
            .map(Duration::from_secs);
        let on_window_failure = var("HISTORY_ON_WINDOW_FAILURE")
            .map(|raw| parse_window_policy(&raw))
            .transpose()?
            .unwrap_or_default();

        let tokens = var("TOKENS")
            .map(|raw| parse_token_list(&raw))
            .transpose()?
            .unwrap_or_else(default_tokens);

        Ok(Self {
            etherscan_api_key,
            etherscan_api_url,
            etherscan_chain_id,
            eth_rpc_url,
            http_bind_addr,
            http_timeout,
            history: HistoryOptions {
                step,
                delay,
                deadline,
                on_window_failure,
            },
            tokens,
        })
    }

    pub fn node_endpoint(&self) -> Result<&str, ConfigError> {
        self.eth_rpc_url
            .as_deref()
            .ok_or(ConfigError::MissingNodeEndpoint)
    }
}

fn parse_number(name: &'static str, raw: Option<String>) -> Result<Option<u64>, ConfigError> {
    raw.map(|value| {
        value
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { name, value })
    })
    .transpose()
}

fn parse_window_policy(raw: &str) -> Result<WindowFailurePolicy, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "skip" => Ok(WindowFailurePolicy::Skip),
        "abort" => Ok(WindowFailurePolicy::Abort),
        _ => Err(ConfigError::InvalidWindowPolicy(raw.to_string())),
    }
}

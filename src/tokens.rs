use std::str::FromStr;

use ethers_core::types::Address;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenDescriptor {
    pub symbol: String,
    pub address: Address,
}

impl TokenDescriptor {
    pub fn new(symbol: impl Into<String>, address: Address) -> Self {
        Self {
            symbol: symbol.into(),
            address,
        }
    }
}

const MAINNET_TOKENS: [(&str, &str); 8] = [
    ("USDT", "0xdAC17F958D2ee523a2206206994597C13D831ec7"),
    ("USDC", "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
    ("DAI", "0x6B175474E89094C44Da98b954EedeAC495271d0F"),
    ("WBTC", "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599"),
    ("LINK", "0x514910771AF9Ca656af840dff83E8264EcF986CA"),
    ("UNI", "0x1f9840a85d5aF5bf1D1762F925BDADdC4201F984"),
    ("AAVE", "0x7Fc66500c84A76Ad7e9c93437bFc5Ac33E2DDaE9"),
    ("COMP", "0xc00e94Cb662C3520282E6f5717214004A7f26888"),
];

/// Well-known mainnet ERC-20 tokens checked by the balance flow.
pub fn default_tokens() -> Vec<TokenDescriptor> {
    MAINNET_TOKENS
        .iter()
        .filter_map(|(symbol, addr)| {
            Address::from_str(addr)
                .ok()
                .map(|address| TokenDescriptor::new(*symbol, address))
        })
        .collect()
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum TokenListError {
    #[error("token entry {0:?} is not SYMBOL=0xADDRESS")]
    MalformedEntry(String),
    #[error("token {symbol} has invalid address {address:?}")]
    InvalidAddress { symbol: String, address: String },
    #[error("token list is empty")]
    Empty,
}

/// Parses `SYM=0xaddr,SYM=0xaddr` into descriptors, keeping the given order.
pub fn parse_token_list(raw: &str) -> Result<Vec<TokenDescriptor>, TokenListError> {
    let mut tokens = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (symbol, address) = entry
            .split_once('=')
            .map(|(s, a)| (s.trim(), a.trim()))
            .filter(|(s, a)| !s.is_empty() && !a.is_empty())
            .ok_or_else(|| TokenListError::MalformedEntry(entry.to_string()))?;
        let parsed = crate::address::validate(address).map_err(|_| {
            TokenListError::InvalidAddress {
                symbol: symbol.to_string(),
                address: address.to_string(),
            }
        })?;
        tokens.push(TokenDescriptor::new(symbol.to_uppercase(), parsed));
    }
    if tokens.is_empty() {
        return Err(TokenListError::Empty);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_list_has_all_eight_tokens() {
        let tokens = default_tokens();
        let symbols: Vec<_> = tokens.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(
            symbols,
            ["USDT", "USDC", "DAI", "WBTC", "LINK", "UNI", "AAVE", "COMP"]
        );
    }

    #[test]
    fn parses_custom_list_in_order() {
        let tokens = parse_token_list(
            " dai=0x6B175474E89094C44Da98b954EedeAC495271d0F, USDT=0xdac17f958d2ee523a2206206994597c13d831ec7",
        )
        .unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].symbol, "DAI");
        assert_eq!(tokens[1].symbol, "USDT");
        assert_eq!(tokens[1].address, default_tokens()[0].address);
    }

    #[test]
    fn rejects_bad_entries() {
        assert_eq!(
            parse_token_list("USDT"),
            Err(TokenListError::MalformedEntry("USDT".into()))
        );
        assert!(matches!(
            parse_token_list("USDT=0x1234"),
            Err(TokenListError::InvalidAddress { .. })
        ));
        assert_eq!(parse_token_list(" , "), Err(TokenListError::Empty));
    }
}

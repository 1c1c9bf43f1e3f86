use ethers_core::types::U256;
use ethers_core::utils::format_units;

/// Decimals of ETH (wei per ether = 10^18).
pub const ETHER_DECIMALS: u32 = 18;

const MAX_DECIMALS: u32 = 76;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitsError {
    #[error("not a base-unit integer: {0:?}")]
    InvalidAmount(String),
    #[error("unsupported decimal count {0}")]
    UnsupportedDecimals(u32),
}

/// Parses a decimal base-unit string such as `"1000000000000000000"`.
pub fn parse_base_units(raw: &str) -> Result<U256, UnitsError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(UnitsError::InvalidAmount(raw.to_string()));
    }
    U256::from_dec_str(trimmed).map_err(|_| UnitsError::InvalidAmount(raw.to_string()))
}

/// Scales `amount` down by `10^decimals`.
pub fn to_decimal(amount: U256, decimals: u32) -> Result<f64, UnitsError> {
    // larger scales overflow U256 formatting
    if decimals > MAX_DECIMALS {
        return Err(UnitsError::UnsupportedDecimals(decimals));
    }
    let formatted =
        format_units(amount, decimals).map_err(|_| UnitsError::UnsupportedDecimals(decimals))?;
    formatted
        .parse::<f64>()
        .map_err(|_| UnitsError::InvalidAmount(formatted))
}

pub fn wei_to_ether(amount: U256) -> Result<f64, UnitsError> {
    to_decimal(amount, ETHER_DECIMALS)
}

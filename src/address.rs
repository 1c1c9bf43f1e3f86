use ethers_core::types::Address;
use ethers_core::utils::to_checksum;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("{0:?} is not 40 hex digits")]
    Malformed(String),
    #[error("{0:?} has an invalid EIP-55 checksum")]
    BadChecksum(String),
}

/// Checks that `input` is a 20-byte hex address. Mixed-case input must carry
/// a valid EIP-55 checksum; all-lower or all-upper input is accepted as is.
pub fn validate(input: &str) -> Result<Address, AddressError> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AddressError::Malformed(input.to_string()));
    }

    let address = digits
        .parse::<Address>()
        .map_err(|_| AddressError::Malformed(input.to_string()))?;

    let has_lower = digits.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = digits.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        let expected = checksummed(&address);
        if &expected[2..] != digits {
            return Err(AddressError::BadChecksum(input.to_string()));
        }
    }

    Ok(address)
}

/// EIP-55 form, e.g. `0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed`.
pub fn checksummed(address: &Address) -> String {
    to_checksum(address, None)
}

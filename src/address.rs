//! EIP-55 checksum address encoding
//!
//! Accepted input is 40 hex characters with an optional `0x`/`0X` prefix, in any
//! letter case. The checksum is computed over the lowercase form, so already
//! checksummed input converts to itself.

use crate::error::{ContractError, ContractResult};

use ethers::types::Address;
use lazy_static::lazy_static;
use regex::Regex;
use sha3::{Digest, Keccak256};

lazy_static! {
    static ref ADDRESS_PATTERN: Regex = Regex::new(r"^(0x|0X)?[0-9a-fA-F]{40}$").unwrap();
}

/// Convert a hex address to its EIP-55 mixed-case form
pub fn to_checksum_address(address: &str) -> ContractResult<String> {
    if !ADDRESS_PATTERN.is_match(address) {
        return Err(ContractError::InvalidAddress(format!(
            "'{}' is not a 40 character hex address",
            address
        )));
    }

    let unprefixed = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address)
        .to_ascii_lowercase();

    Ok(apply_checksum(&unprefixed))
}

/// Check if an address is already in its checksum form
///
/// Invalid input is reported as `false`.
pub fn is_checksum_address(address: &str) -> bool {
    match to_checksum_address(address) {
        Ok(checksummed) => checksummed == address,
        Err(_) => false,
    }
}

/// Render a parsed address in checksum form
pub fn checksum(address: &Address) -> String {
    apply_checksum(&hex::encode(address.as_bytes()))
}

/// `lower_hex` must be exactly 40 lowercase hex characters.
fn apply_checksum(lower_hex: &str) -> String {
    let digest = hex::encode(Keccak256::digest(lower_hex.as_bytes()));

    let mut checksummed = String::with_capacity(42);
    checksummed.push_str("0x");

    for (c, nibble) in lower_hex.chars().zip(digest.chars()) {
        // digest is lowercase hex, so every char parses
        let value = nibble.to_digit(16).unwrap_or(0);
        if value > 7 {
            checksummed.push(c.to_ascii_uppercase());
        } else {
            checksummed.push(c);
        }
    }

    checksummed
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";

    #[test]
    fn checksum_usdc_address() {
        let result = to_checksum_address("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48").unwrap();
        assert_eq!(result, USDC);
        assert!(is_checksum_address(&result));
    }

    #[test]
    fn eip55_test_vectors() {
        let cases = [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
            "0x52908400098527886E0F7030069857D2E4169EE7",
            "0xde709f2102306220921060314715629080e2fb77",
        ];

        for expected in &cases {
            let lower = expected.to_lowercase();
            assert_eq!(&to_checksum_address(&lower).unwrap(), expected);
            assert!(is_checksum_address(expected), "{} should verify", expected);
        }
    }

    #[test]
    fn input_case_does_not_matter() {
        let lower = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
        let upper = format!("0x{}", lower[2..].to_uppercase());

        assert_eq!(
            to_checksum_address(lower).unwrap(),
            to_checksum_address(&upper).unwrap()
        );
        assert_eq!(to_checksum_address(USDC).unwrap(), USDC);
    }

    #[test]
    fn prefix_is_optional() {
        let result = to_checksum_address("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48").unwrap();
        assert_eq!(result, USDC);

        let result = to_checksum_address("0XA0B86991C6218B36C1D19D4A2E9EB0CE3606EB48").unwrap();
        assert_eq!(result, USDC);
    }

    #[test]
    fn conversion_is_deterministic() {
        let first = to_checksum_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
        let second = to_checksum_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn round_trip_holds_for_arbitrary_addresses() {
        for seed in 0u8..32 {
            let bytes: Vec<u8> = (0..20u8).map(|i| i.wrapping_mul(37).wrapping_add(seed)).collect();
            let addr = format!("0x{}", hex::encode(&bytes));
            let checksummed = to_checksum_address(&addr).unwrap();
            assert!(is_checksum_address(&checksummed));
            assert_eq!(checksummed.to_lowercase(), addr);
        }
    }

    #[test]
    fn rejects_invalid_addresses() {
        assert!(to_checksum_address("0xdeadbeef").is_err());
        assert!(to_checksum_address("0xGGGGb6053F3E94C9b9A09f33669435E7Ef1BeAed").is_err());
        assert!(to_checksum_address("").is_err());
        assert!(to_checksum_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed00").is_err());
        assert!(to_checksum_address(" 0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").is_err());

        assert!(!is_checksum_address("0xdeadbeef"));
    }

    #[test]
    fn wrong_case_fails_verification() {
        assert!(!is_checksum_address("0x5AAEB6053F3E94C9b9A09f33669435E7Ef1BeAed"));
        assert!(!is_checksum_address("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"));
    }

    #[test]
    fn typed_address_checksum() {
        let address: Address = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".parse().unwrap();
        assert_eq!(checksum(&address), USDC);
    }
}

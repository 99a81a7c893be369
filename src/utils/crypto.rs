// src/utils/crypto.rs
//! Hashing and address utilities compatible with Ethereum identity contracts.
//!
//! Uses Keccak-256 (Ethereum's standard hash function) for all operations.

use ethers::types::{Address, H256};
use ethers::utils::{hex, keccak256, to_checksum};

/// Computes a Keccak-256 hash of the input data (Ethereum-compatible).
pub fn hash_data(data: &[u8]) -> [u8; 32] {
    keccak256(data)
}

/// Hash under which an identity contract stores a key.
///
/// Keys written as strict hex (`0x` followed by an even number of hex digits)
/// are hashed as raw bytes, so an address hashes over its 20 bytes. Anything
/// else is hashed as UTF-8 text.
pub fn key_hash(key: &str) -> H256 {
    match strict_hex_bytes(key) {
        Some(bytes) => H256(hash_data(&bytes)),
        None => H256(hash_data(key.as_bytes())),
    }
}

fn strict_hex_bytes(value: &str) -> Option<Vec<u8>> {
    let digits = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X"))?;
    if digits.len() % 2 != 0 {
        return None;
    }
    hex::decode(digits).ok()
}

/// Returns `true` if `value` is syntactically a blockchain address.
///
/// Accepts 40 hex digits with an optional `0x` prefix. All-lowercase and
/// all-uppercase forms are accepted as-is; mixed case must carry a valid
/// EIP-55 checksum.
pub fn is_address(value: &str) -> bool {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }
    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    if !(has_lower && has_upper) {
        return true;
    }
    match digits.parse::<Address>() {
        Ok(address) => &checksum_address(&address)[2..] == digits,
        Err(_) => false,
    }
}

/// Parses an address string, rejecting anything [`is_address`] rejects.
pub fn parse_address(value: &str) -> Option<Address> {
    if !is_address(value) {
        return None;
    }
    value.strip_prefix("0x").unwrap_or(value).parse().ok()
}

/// EIP-55 checksummed `0x` form of an address.
pub fn checksum_address(address: &Address) -> String {
    to_checksum(address, None)
}

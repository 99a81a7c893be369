// src/models/did.rs
//! Decentralized Identifier (DID) parsing.
//!
//! Identities in this system are on-chain identity contracts referenced as
//! `did:<chain>:<contractAddress>`. Only that three-segment form is supported.

use crate::error::DidError;
use crate::utils::crypto::parse_address;
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A parsed `did:<chain>:<address>` identifier.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Did {
    /// Chain name, e.g. `didux`
    pub chain: String,

    /// Identity contract address exactly as written in the DID
    pub address: String,
}

impl Did {
    /// The identity contract address, if the address segment is a valid address.
    pub fn contract_address(&self) -> Option<Address> {
        parse_address(&self.address)
    }
}

impl FromStr for Did {
    type Err = DidError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = value.split(':').collect();
        match segments.as_slice() {
            ["did", chain, address] if !chain.is_empty() && !address.is_empty() => Ok(Did {
                chain: (*chain).to_string(),
                address: (*address).to_string(),
            }),
            _ => Err(DidError::Unsupported(value.to_string())),
        }
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "did:{}:{}", self.chain, self.address)
    }
}

/// Extracts the identity contract address segment from a DID string.
///
/// Returns `None` (and logs) for anything other than `did:<chain>:<address>`.
pub fn contract_address_from_did(did: &str) -> Option<String> {
    match did.parse::<Did>() {
        Ok(parsed) => Some(parsed.address),
        Err(err) => {
            log::debug!("{}", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_three_segment_did() {
        let did: Did = "did:didux:0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".parse().unwrap();
        assert_eq!(did.chain, "didux");
        assert_eq!(did.address, "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
        assert!(did.contract_address().is_some());
        assert_eq!(did.to_string(), "did:didux:0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
    }

    #[test]
    fn test_rejects_other_forms() {
        assert!("didux:0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".parse::<Did>().is_err());
        assert!("foo:didux:0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".parse::<Did>().is_err());
        assert!("did:didux:0x1:extra".parse::<Did>().is_err());
        assert!("did::0x1".parse::<Did>().is_err());
        assert_eq!(contract_address_from_did("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"), None);
    }

    #[test]
    fn test_non_address_segment_has_no_contract() {
        let did: Did = "did:didux:not-an-address".parse().unwrap();
        assert_eq!(did.contract_address(), None);
    }
}

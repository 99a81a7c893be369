// src/models/claim.rs
//! Records read from on-chain identity contracts: key purposes and claims.

use crate::error::RegistryError;
use crate::models::credential::DateValue;
use chrono::{DateTime, Utc};
use ethers::types::{Address, Bytes, U256};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Purpose of a key registered on an identity contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPurpose {
    /// Key is not registered
    Unset,
    Management,
    Action,
    ClaimSigner,
    Encryption,
    Other(u64),
}

impl KeyPurpose {
    pub fn from_u256(value: U256) -> Self {
        if value > U256::from(u64::MAX) {
            return KeyPurpose::Other(u64::MAX);
        }
        match value.as_u64() {
            0 => KeyPurpose::Unset,
            1 => KeyPurpose::Management,
            2 => KeyPurpose::Action,
            3 => KeyPurpose::ClaimSigner,
            4 => KeyPurpose::Encryption,
            other => KeyPurpose::Other(other),
        }
    }

    pub fn as_u256(self) -> U256 {
        U256::from(match self {
            KeyPurpose::Unset => 0,
            KeyPurpose::Management => 1,
            KeyPurpose::Action => 2,
            KeyPurpose::ClaimSigner => 3,
            KeyPurpose::Encryption => 4,
            KeyPurpose::Other(value) => value,
        })
    }

    /// Owner, action and claim-signer keys may sign on behalf of the identity.
    pub fn can_sign(self) -> bool {
        matches!(
            self,
            KeyPurpose::Management | KeyPurpose::Action | KeyPurpose::ClaimSigner
        )
    }

    /// Management and action keys may act for an organisation.
    pub fn can_manage(self) -> bool {
        matches!(self, KeyPurpose::Management | KeyPurpose::Action)
    }
}

/// A claim as returned by `getClaim`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawClaim {
    pub claim_type: U256,
    pub scheme: U256,
    pub issuer: Address,
    pub signature: Bytes,
    pub data: Bytes,
    pub uri: String,
}

impl RawClaim {
    /// Parses the ASCII-encoded JSON document in `data`.
    ///
    /// Returns `Ok(None)` when the claim carries no document (one byte or
    /// less), and an error when it carries something that is not JSON.
    pub fn parse_data<T: DeserializeOwned>(&self) -> Result<Option<T>, RegistryError> {
        if self.data.len() <= 1 {
            return Ok(None);
        }
        let text = std::str::from_utf8(&self.data)
            .map_err(|e| RegistryError::MalformedClaim(e.to_string()))?;
        serde_json::from_str(text)
            .map(Some)
            .map_err(|e| RegistryError::MalformedClaim(e.to_string()))
    }
}

/// Attestation by a trusted party listing the `"<provider>_<credentialKey>"`
/// strings an issuer may produce.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrustClaim {
    pub expiration_date: DateValue,
    pub keys: Vec<String>,
}

impl TrustClaim {
    /// An unreadable expiration date counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiration_date.to_datetime() {
            Some(expiration) => expiration <= now,
            None => true,
        }
    }

    pub fn allows(&self, provider_key: &str) -> bool {
        self.keys.iter().any(|key| key == provider_key)
    }
}

/// Organisation details published as a company-info claim.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_additions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub btw_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashed_public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kvk_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organisation_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organisation_city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organisation_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn raw(data: &[u8]) -> RawClaim {
        RawClaim {
            claim_type: U256::one(),
            scheme: U256::one(),
            issuer: Address::zero(),
            signature: Bytes::default(),
            data: Bytes::from(data.to_vec()),
            uri: String::new(),
        }
    }

    #[test]
    fn test_key_purpose_mapping() {
        assert_eq!(KeyPurpose::from_u256(U256::zero()), KeyPurpose::Unset);
        assert_eq!(KeyPurpose::from_u256(U256::from(2)), KeyPurpose::Action);
        assert_eq!(KeyPurpose::from_u256(U256::from(9)), KeyPurpose::Other(9));
        assert!(KeyPurpose::ClaimSigner.can_sign());
        assert!(!KeyPurpose::Encryption.can_sign());
        assert!(!KeyPurpose::Unset.can_sign());
        assert!(!KeyPurpose::ClaimSigner.can_manage());
        assert_eq!(KeyPurpose::from_u256(KeyPurpose::Action.as_u256()), KeyPurpose::Action);
    }

    #[test]
    fn test_parse_claim_data() {
        let claim: TrustClaim = raw(br#"{"expirationDate":"2030-01-01T00:00:00Z","keys":["GOV_age_over_18"]}"#)
            .parse_data()
            .unwrap()
            .unwrap();
        assert!(claim.allows("GOV_age_over_18"));
        assert!(!claim.allows("GOV_name"));

        assert_eq!(raw(b"").parse_data::<TrustClaim>().unwrap(), None);
        assert_eq!(raw(b"x").parse_data::<TrustClaim>().unwrap(), None);
        assert!(matches!(
            raw(b"not json").parse_data::<TrustClaim>(),
            Err(RegistryError::MalformedClaim(_))
        ));
    }

    #[test]
    fn test_trust_claim_expiry() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let claim = TrustClaim {
            expiration_date: DateValue::from(now),
            keys: vec![],
        };
        assert!(claim.is_expired_at(now));
        assert!(!claim.is_expired_at(now - chrono::Duration::seconds(1)));

        let unreadable = TrustClaim {
            expiration_date: DateValue::Text("never".into()),
            keys: vec![],
        };
        assert!(unreadable.is_expired_at(now));
    }
}

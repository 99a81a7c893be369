// src/contracts/memory.rs
//! In-memory identity registry for offline use and tests.

use crate::contracts::identity_registry::{issuer_claim_type, IdentityRegistry};
use crate::error::RegistryError;
use crate::models::claim::{KeyPurpose, RawClaim, TrustClaim};
use crate::utils::crypto::{hash_data, key_hash};
use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A fixed set of keys and claims, with a counter of every lookup made.
///
/// Built once with the `with_*` methods, then shared read-only.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    keys: HashMap<(Address, H256), KeyPurpose>,
    claims: HashMap<(Address, U256), Vec<H256>>,
    claim_records: HashMap<(Address, H256), RawClaim>,
    unavailable: bool,
    calls: AtomicUsize,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry whose every lookup fails, as an unreachable RPC node would.
    pub fn unavailable() -> Self {
        InMemoryRegistry {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Registers `key` (an address or any other key text) on `identity`.
    pub fn with_key(mut self, identity: Address, key: &str, purpose: KeyPurpose) -> Self {
        self.keys.insert((identity, key_hash(key)), purpose);
        self
    }

    /// Adds a claim carrying `data` to `identity`. Later claims of the same
    /// type become the most recent.
    pub fn with_claim(mut self, identity: Address, claim_type: U256, issuer: Address, data: Vec<u8>) -> Self {
        let ids = self.claims.entry((identity, claim_type)).or_default();

        let mut seed = identity.as_bytes().to_vec();
        let mut type_bytes = [0u8; 32];
        claim_type.to_big_endian(&mut type_bytes);
        seed.extend_from_slice(&type_bytes);
        seed.extend_from_slice(&(ids.len() as u64).to_be_bytes());
        let id = H256(hash_data(&seed));

        ids.push(id);
        self.claim_records.insert(
            (identity, id),
            RawClaim {
                claim_type,
                scheme: U256::one(),
                issuer,
                signature: Bytes::default(),
                data: Bytes::from(data),
                uri: String::new(),
            },
        );
        self
    }

    /// `trusted` attests which keys `issuer` may issue.
    pub fn with_trust_claim(self, trusted: Address, issuer: Address, claim: &TrustClaim) -> Self {
        let data = serde_json::to_vec(claim).unwrap_or_default();
        self.with_claim(trusted, issuer_claim_type(issuer), trusted, data)
    }

    /// Number of lookups served (or refused) so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) -> Result<(), RegistryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(RegistryError::Unavailable("in-memory registry marked unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityRegistry for InMemoryRegistry {
    async fn key_purpose(&self, identity: Address, key_hash: H256) -> Result<KeyPurpose, RegistryError> {
        self.record_call()?;
        Ok(self
            .keys
            .get(&(identity, key_hash))
            .copied()
            .unwrap_or(KeyPurpose::Unset))
    }

    async fn key_has_purpose(
        &self,
        identity: Address,
        key_hash: H256,
        purpose: KeyPurpose,
    ) -> Result<bool, RegistryError> {
        self.record_call()?;
        Ok(self.keys.get(&(identity, key_hash)) == Some(&purpose))
    }

    async fn claim_ids_by_type(&self, identity: Address, claim_type: U256) -> Result<Vec<H256>, RegistryError> {
        self.record_call()?;
        Ok(self.claims.get(&(identity, claim_type)).cloned().unwrap_or_default())
    }

    async fn claim(&self, identity: Address, claim_id: H256) -> Result<Option<RawClaim>, RegistryError> {
        self.record_call()?;
        Ok(self.claim_records.get(&(identity, claim_id)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credential::DateValue;

    fn address(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[tokio::test]
    async fn test_latest_claim_is_the_last_added() {
        let first = TrustClaim {
            expiration_date: DateValue::Text("2030-01-01".into()),
            keys: vec!["GOV_name".into()],
        };
        let second = TrustClaim {
            keys: vec!["GOV_age_over_18".into()],
            ..first.clone()
        };
        let registry = InMemoryRegistry::new()
            .with_trust_claim(address(1), address(2), &first)
            .with_trust_claim(address(1), address(2), &second);

        let latest = registry
            .latest_claim(address(1), issuer_claim_type(address(2)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.parse_data::<TrustClaim>().unwrap(), Some(second));
        assert_eq!(registry.call_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_keys_are_unset() {
        let registry = InMemoryRegistry::new().with_key(address(1), "0x1111111111111111111111111111111111111111", KeyPurpose::Action);
        assert_eq!(
            registry.key_purpose(address(1), key_hash("0x2222222222222222222222222222222222222222")).await.unwrap(),
            KeyPurpose::Unset
        );
        assert!(registry
            .key_has_purpose(address(1), key_hash("0x1111111111111111111111111111111111111111"), KeyPurpose::Action)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_unavailable_registry_errors_and_counts() {
        let registry = InMemoryRegistry::unavailable();
        assert!(registry.key_purpose(address(1), H256::zero()).await.is_err());
        assert!(registry.latest_claim(address(1), U256::one()).await.is_err());
        assert_eq!(registry.call_count(), 2);
    }
}

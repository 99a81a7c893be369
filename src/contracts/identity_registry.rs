// src/contracts/identity_registry.rs
//! Identity contract interface.
//!
//! Identity contracts register keys with a purpose (management, action,
//! claim signer, encryption) and hold claims: attestations whose `data` is a
//! JSON document. The engine only reads from them.

use crate::blockchain::evm_client::EvmClient;
use crate::error::RegistryError;
use crate::models::claim::{KeyPurpose, RawClaim};
use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};
use ethers_contract::BaseContract;

/// Read-only view of on-chain identity contracts.
///
/// Implementations must report transport or decoding failures as
/// [`RegistryError`], never as "unset" or "no claims".
#[async_trait]
pub trait IdentityRegistry: Send + Sync {
    /// `getKeyPurpose(keccak256(key))` on the identity contract at `identity`.
    async fn key_purpose(&self, identity: Address, key_hash: H256) -> Result<KeyPurpose, RegistryError>;

    /// `keyHasPurpose(keccak256(key), purpose)` on the identity contract at `identity`.
    async fn key_has_purpose(
        &self,
        identity: Address,
        key_hash: H256,
        purpose: KeyPurpose,
    ) -> Result<bool, RegistryError>;

    /// `getClaimIdsByType(claimType)`; the most recent id is last.
    async fn claim_ids_by_type(&self, identity: Address, claim_type: U256) -> Result<Vec<H256>, RegistryError>;

    /// `getClaim(claimId)`.
    async fn claim(&self, identity: Address, claim_id: H256) -> Result<Option<RawClaim>, RegistryError>;

    /// The most recent claim of `claim_type` held by `identity`.
    async fn latest_claim(&self, identity: Address, claim_type: U256) -> Result<Option<RawClaim>, RegistryError> {
        let ids = self.claim_ids_by_type(identity, claim_type).await?;
        match ids.last() {
            Some(id) => self.claim(identity, *id).await,
            None => Ok(None),
        }
    }
}

/// Claim type under which a trusted party attests what `issuer` may issue:
/// the issuer's contract address read as a number.
pub fn issuer_claim_type(issuer: Address) -> U256 {
    U256::from_big_endian(issuer.as_bytes())
}

/// [`IdentityRegistry`] backed by `ClaimHolder` contracts over JSON-RPC.
#[derive(Clone, Debug)]
pub struct ClaimHolderRegistry {
    client: EvmClient,
    abi: BaseContract,
}

impl ClaimHolderRegistry {
    pub fn new(client: EvmClient) -> Result<Self, RegistryError> {
        Ok(Self {
            client,
            abi: EvmClient::load_abi(include_bytes!("../abi/ClaimHolder.json"))?,
        })
    }

    /// Connects to the JSON-RPC endpoint at `rpc_url`.
    pub fn connect(rpc_url: &str) -> Result<Self, RegistryError> {
        Self::new(EvmClient::new(rpc_url)?)
    }
}

#[async_trait]
impl IdentityRegistry for ClaimHolderRegistry {
    async fn key_purpose(&self, identity: Address, key_hash: H256) -> Result<KeyPurpose, RegistryError> {
        let purpose: Option<U256> = self
            .client
            .query_contract(identity, &self.abi, "getKeyPurpose", key_hash)
            .await?;
        Ok(purpose.map(KeyPurpose::from_u256).unwrap_or(KeyPurpose::Unset))
    }

    async fn key_has_purpose(
        &self,
        identity: Address,
        key_hash: H256,
        purpose: KeyPurpose,
    ) -> Result<bool, RegistryError> {
        let result: Option<bool> = self
            .client
            .query_contract(identity, &self.abi, "keyHasPurpose", (key_hash, purpose.as_u256()))
            .await?;
        Ok(result.unwrap_or(false))
    }

    async fn claim_ids_by_type(&self, identity: Address, claim_type: U256) -> Result<Vec<H256>, RegistryError> {
        let ids: Option<Vec<H256>> = self
            .client
            .query_contract(identity, &self.abi, "getClaimIdsByType", claim_type)
            .await?;
        Ok(ids.unwrap_or_default())
    }

    async fn claim(&self, identity: Address, claim_id: H256) -> Result<Option<RawClaim>, RegistryError> {
        let raw: Option<(U256, U256, Address, Bytes, Bytes, String)> = self
            .client
            .query_contract(identity, &self.abi, "getClaim", claim_id)
            .await?;
        Ok(raw.map(|(claim_type, scheme, issuer, signature, data, uri)| RawClaim {
            claim_type,
            scheme,
            issuer,
            signature,
            data,
            uri,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::crypto::key_hash;
    use mockito::mock;

    const IDENTITY: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";

    fn rpc_result(result: &str) -> String {
        format!(r#"{{"jsonrpc":"2.0","id":1,"result":"{}"}}"#, result)
    }

    fn identity() -> Address {
        IDENTITY.parse().unwrap()
    }

    #[test]
    fn test_issuer_claim_type_is_address_as_number() {
        let issuer = identity();
        let claim_type = issuer_claim_type(issuer);
        let mut bytes = [0u8; 32];
        claim_type.to_big_endian(&mut bytes);
        assert_eq!(&bytes[12..], issuer.as_bytes());
        assert!(bytes[..12].iter().all(|b| *b == 0));
    }

    #[tokio::test]
    async fn test_key_purpose_decodes_uint() {
        let _m = mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(rpc_result(
                "0x0000000000000000000000000000000000000000000000000000000000000002",
            ))
            .create();

        let registry = ClaimHolderRegistry::connect(&mockito::server_url()).unwrap();
        let purpose = registry.key_purpose(identity(), key_hash(IDENTITY)).await.unwrap();
        assert_eq!(purpose, KeyPurpose::Action);
    }

    #[tokio::test]
    async fn test_empty_output_means_no_contract() {
        let _m = mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(rpc_result("0x"))
            .create();

        let registry = ClaimHolderRegistry::connect(&mockito::server_url()).unwrap();
        let purpose = registry.key_purpose(identity(), key_hash(IDENTITY)).await.unwrap();
        assert_eq!(purpose, KeyPurpose::Unset);
    }

    #[tokio::test]
    async fn test_rpc_error_is_surfaced() {
        let _m = mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"execution reverted"}}"#)
            .create();

        let registry = ClaimHolderRegistry::connect(&mockito::server_url()).unwrap();
        let result = registry.key_purpose(identity(), key_hash(IDENTITY)).await;
        assert!(matches!(result, Err(RegistryError::Rpc { method: "getKeyPurpose", .. })));
    }
}

// src/services/organisation.rs
//! Checks on relying parties (organisations) rather than on holders.
//!
//! An organisation proves who it is by signing its data requests with a
//! management or action key of its identity contract, and may publish a
//! company-info claim (its licence) on that contract.

use crate::contracts::identity_registry::{ClaimHolderRegistry, IdentityRegistry};
use crate::error::RegistryError;
use crate::models::challenge::Challenge;
use crate::models::claim::KeyPurpose;
use crate::models::credential::Credential;
use crate::models::did::Did;
use crate::models::requested::RequestedCredentials;
use crate::services::authorization::IdentityAuthorizer;
use crate::settings::Settings;
use crate::utils::crypto::key_hash;
use crate::wallet::signature::{recover_canonical_signer, signature_matches, verify_challenge};
use chrono::{DateTime, Utc};
use ethers::types::{Address, U256};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Verifies organisation requests and licences against identity contracts.
pub struct OrganisationVerifier<R: IdentityRegistry + ?Sized> {
    registry: Arc<R>,
    /// Claim type under which organisations publish company info
    company_info_claim_type: U256,
}

impl OrganisationVerifier<ClaimHolderRegistry> {
    pub fn from_settings(settings: &Settings) -> Result<Self, RegistryError> {
        let registry = ClaimHolderRegistry::connect(&settings.rpc_url)?;
        Ok(Self::new(
            Arc::new(registry),
            U256::from(settings.company_info_claim_type),
        ))
    }
}

impl<R: IdentityRegistry + ?Sized> OrganisationVerifier<R> {
    pub fn new(registry: Arc<R>, company_info_claim_type: U256) -> Self {
        OrganisationVerifier {
            registry,
            company_info_claim_type,
        }
    }

    /// `true` if `requested` is signed by its `proof.holder` and that key is a
    /// management or action key of the identity named by `requested.id`.
    pub async fn is_valid_requested_credentials(&self, requested: &RequestedCredentials) -> Result<bool, RegistryError> {
        let Some(proof) = requested.proof.as_ref() else {
            log::warn!("requested credentials carry no proof");
            return Ok(false);
        };
        let Some(signature) = proof.signature.as_deref() else {
            log::warn!("requested credentials carry no signature");
            return Ok(false);
        };

        let unsigned = RequestedCredentials {
            proof: Some(proof.without_signature()),
            ..requested.clone()
        };
        let recovered = match recover_canonical_signer(&unsigned, signature) {
            Ok(recovered) => recovered,
            Err(err) => {
                log::warn!("requested credentials signature unreadable: {}", err);
                return Ok(false);
            }
        };
        if !signature_matches(&proof.holder, &recovered) {
            log::warn!("recovered address {} does not match holder {}", recovered, proof.holder);
            return Ok(false);
        }

        let Some(organisation) = requested.id.as_deref().and_then(identity_contract) else {
            return Ok(false);
        };
        let purpose = self.registry.key_purpose(organisation, key_hash(&recovered)).await?;
        Ok(purpose.can_manage())
    }

    /// Latest company-info claim of the organisation behind `requested.id`.
    pub async fn license_claim<T: DeserializeOwned>(
        &self,
        requested: &RequestedCredentials,
    ) -> Result<Option<T>, RegistryError> {
        let Some(organisation) = requested.id.as_deref().and_then(identity_contract) else {
            return Ok(None);
        };
        match self.registry.latest_claim(organisation, self.company_info_claim_type).await? {
            Some(raw) => raw.parse_data(),
            None => Ok(None),
        }
    }

    /// Checks a licence credential at the current time.
    pub async fn is_valid_license_credential(&self, credential: &Value) -> Result<bool, RegistryError> {
        self.is_valid_license_credential_at(credential, Utc::now()).await
    }

    /// `true` if `credential` is signed by its `proof.holder`, that key is a
    /// management or action key of the issuing organisation, and the credential
    /// has not expired at `now`.
    pub async fn is_valid_license_credential_at(
        &self,
        credential: &Value,
        now: DateTime<Utc>,
    ) -> Result<bool, RegistryError> {
        let parsed: Credential = match serde_json::from_value(credential.clone()) {
            Ok(parsed) => parsed,
            Err(err) => {
                log::warn!("licence credential malformed: {}", err);
                return Ok(false);
            }
        };
        let Some((holder, signature)) = parsed
            .proof
            .as_ref()
            .and_then(|proof| Some((proof.holder.as_str(), proof.signature.as_deref()?)))
        else {
            log::warn!("licence credential carries no signature");
            return Ok(false);
        };

        let mut unsigned = credential.clone();
        if let Some(proof) = unsigned.get_mut("proof").and_then(Value::as_object_mut) {
            proof.remove("signature");
        }
        match recover_canonical_signer(&unsigned, signature) {
            Ok(recovered) if signature_matches(holder, &recovered) => {}
            Ok(recovered) => {
                log::warn!("recovered address {} does not match holder {}", recovered, holder);
                return Ok(false);
            }
            Err(err) => {
                log::warn!("licence signature unreadable: {}", err);
                return Ok(false);
            }
        }

        let Some(issuer) = identity_contract(&parsed.issuer.id) else {
            return Ok(false);
        };
        let purpose = self.registry.key_purpose(issuer, key_hash(holder)).await?;
        if !purpose.can_manage() {
            log::warn!("key purpose {:?} of {} is not management or action", purpose, holder);
            return Ok(false);
        }

        match parsed.is_expired_at(now) {
            Some(false) => Ok(true),
            _ => {
                log::warn!("licence credential expired or undated");
                Ok(false)
            }
        }
    }

    /// `keyHasPurpose(keccak256(key), purpose)` on the identity behind `did`.
    pub async fn check_key_for_did(&self, did: &str, key: &str, purpose: KeyPurpose) -> Result<bool, RegistryError> {
        match identity_contract(did) {
            Some(identity) => self.registry.key_has_purpose(identity, key_hash(key), purpose).await,
            None => Ok(false),
        }
    }

    /// `true` if `challenge` is well formed, signed by its `public_key`, and
    /// that key may sign for the identity named by `challenge.did`.
    pub async fn verify_challenge_for_did(&self, challenge: &Challenge) -> Result<bool, RegistryError> {
        if !verify_challenge(challenge) {
            return Ok(false);
        }
        IdentityAuthorizer::new(self.registry.as_ref())
            .is_authorized_for_did(&challenge.public_key, &challenge.did)
            .await
    }
}

fn identity_contract(did: &str) -> Option<Address> {
    match did.parse::<Did>() {
        Ok(did) => did.contract_address(),
        Err(err) => {
            log::debug!("{}", err);
            None
        }
    }
}

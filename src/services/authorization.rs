// src/services/authorization.rs
//! Identity key authorization.
//!
//! Decides whether a signing key may act for an identity contract. Results are
//! memoized for the lifetime of one [`IdentityAuthorizer`], which is created
//! fresh for every validation call.

use crate::contracts::identity_registry::IdentityRegistry;
use crate::error::RegistryError;
use crate::models::did::contract_address_from_did;
use crate::utils::crypto::{key_hash, parse_address};
use std::collections::HashMap;

/// Per-call authorization resolver.
///
/// Cache entries are keyed by `(identity address, signer key)` exactly as
/// written. Registry failures are returned to the caller and never cached.
pub struct IdentityAuthorizer<'a, R: IdentityRegistry + ?Sized> {
    registry: &'a R,
    cache: HashMap<(String, String), bool>,
}

impl<'a, R: IdentityRegistry + ?Sized> IdentityAuthorizer<'a, R> {
    pub fn new(registry: &'a R) -> Self {
        IdentityAuthorizer {
            registry,
            cache: HashMap::new(),
        }
    }

    /// `true` if `signer_key` may sign for the identity named by `did`.
    ///
    /// A DID that is not `did:<chain>:<address>` is never authorized and
    /// costs no registry call.
    pub async fn is_authorized_for_did(&mut self, signer_key: &str, did: &str) -> Result<bool, RegistryError> {
        match contract_address_from_did(did) {
            Some(identity) => self.is_authorized(signer_key, &identity).await,
            None => Ok(false),
        }
    }

    /// `true` if `signer_key` may sign for the identity contract at `identity`.
    ///
    /// An identity is its own key when both are written identically. Otherwise
    /// the key must be registered on the contract as management, action or
    /// claim-signer key.
    pub async fn is_authorized(&mut self, signer_key: &str, identity: &str) -> Result<bool, RegistryError> {
        let cache_key = (identity.to_string(), signer_key.to_string());
        if let Some(authorized) = self.cache.get(&cache_key) {
            return Ok(*authorized);
        }

        let authorized = self.resolve(signer_key, identity).await?;
        self.cache.insert(cache_key, authorized);
        Ok(authorized)
    }

    async fn resolve(&self, signer_key: &str, identity: &str) -> Result<bool, RegistryError> {
        if identity == signer_key {
            return Ok(true);
        }
        let Some(contract) = parse_address(identity) else {
            log::debug!("identity `{}` is not an address; key {} not authorized", identity, signer_key);
            return Ok(false);
        };

        let purpose = self.registry.key_purpose(contract, key_hash(signer_key)).await?;
        if !purpose.can_sign() {
            log::debug!("key {} has purpose {:?} on {}", signer_key, purpose, identity);
        }
        Ok(purpose.can_sign())
    }

    /// Number of distinct `(identity, key)` pairs resolved so far.
    pub fn resolved(&self) -> usize {
        self.cache.len()
    }
}

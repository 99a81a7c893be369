// src/models/credential_object.rs
//! Credential bundles as presented to a relying party.
//!
//! A [`CredentialObject`] groups credentials by provider. Each provider group
//! ([`CredentialKeyObject`]) is signed once by the holder; its proof signature
//! covers the canonical form of `{"credentials": {<provider>: <group>}}` with
//! the group's own signature removed. The group's credential keys are in exact
//! code-unit order there; everything else follows [`canonicalize`].

use crate::models::credential::Proof;
use crate::utils::serialization::{canonicalize, canonicalize_credential_map, deserialize};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Provider tag for data the holder typed in themselves.
pub const OWN_PROVIDER: &str = "OWN";
/// Provider tag for answers to a relying party's free-form questions.
pub const ADDITIONAL_INFO_PROVIDER: &str = "ADDITIONAL_INFO";
/// Provider tag for handwritten-signature captures.
pub const SIGNATURE_PROVIDER: &str = "SIGNATURE";

/// Providers holding self-asserted data. They are never checked
/// cryptographically and never count towards a verdict.
pub const SELF_ASSERTED_PROVIDERS: [&str; 3] =
    [OWN_PROVIDER, ADDITIONAL_INFO_PROVIDER, SIGNATURE_PROVIDER];

/// All credentials obtained from one provider, signed once by the holder.
///
/// Credentials are kept as raw JSON so the holder and issuer signatures can be
/// checked over exactly what was presented. Self-asserted providers store
/// entries that are not [`Credential`](crate::models::credential::Credential)s.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CredentialKeyObject {
    pub credentials: Map<String, Value>,

    /// Holder-side proof
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,
}

impl CredentialKeyObject {
    /// Copy of this group with the holder signature removed.
    pub fn without_signature(&self) -> Self {
        CredentialKeyObject {
            credentials: self.credentials.clone(),
            proof: self.proof.as_ref().map(Proof::without_signature),
        }
    }

    /// Canonical JSON of this group, with the credential keys in exact order.
    fn canonical_value(&self) -> Result<Value, serde_json::Error> {
        let mut value = canonicalize(&serde_json::to_value(self)?);
        if let Some(credentials) = value.get_mut("credentials").and_then(Value::as_object_mut) {
            *credentials = canonicalize_credential_map(credentials);
        }
        Ok(value)
    }
}

/// The full bundle presented to a relying party, keyed by provider name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CredentialObject {
    pub credentials: BTreeMap<String, CredentialKeyObject>,
}

impl CredentialObject {
    /// Parses a bundle received as JSON text.
    pub fn from_json_str(data: &str) -> Result<Self, serde_json::Error> {
        deserialize(data)
    }

    /// Returns a copy with every nested object in canonical key order.
    pub fn canonical(&self) -> Result<Self, serde_json::Error> {
        let mut credentials = BTreeMap::new();
        for (provider, group) in &self.credentials {
            credentials.insert(provider.clone(), serde_json::from_value(group.canonical_value()?)?);
        }
        Ok(CredentialObject { credentials })
    }

    /// The value the holder signed for `provider`:
    /// `{"credentials": {<provider>: <group without signature>}}`.
    pub fn provider_payload(&self, provider: &str) -> Result<Option<Value>, serde_json::Error> {
        let Some(group) = self.credentials.get(provider) else {
            return Ok(None);
        };
        Ok(Some(Self::group_payload(provider, group)?))
    }

    /// Payload signed by a holder for a single provider group, already in
    /// signing order. Serialize it as-is; canonicalizing it again would
    /// reorder the credential keys.
    pub fn group_payload(provider: &str, group: &CredentialKeyObject) -> Result<Value, serde_json::Error> {
        let mut providers = Map::new();
        providers.insert(provider.to_string(), group.without_signature().canonical_value()?);

        let mut payload = Map::new();
        payload.insert("credentials".to_string(), Value::Object(providers));
        Ok(Value::Object(payload))
    }

    /// The exact text a holder signs for a single provider group.
    pub fn group_signing_text(provider: &str, group: &CredentialKeyObject) -> Result<String, serde_json::Error> {
        serde_json::to_string(&Self::group_payload(provider, group)?)
    }

    /// `true` if `provider` holds a non-null entry under `key`.
    pub fn contains_key(&self, provider: &str, key: &str) -> bool {
        self.credentials
            .get(provider)
            .and_then(|group| group.credentials.get(key))
            .is_some_and(|entry| !entry.is_null())
    }

    /// `true` if any provider holds a non-null entry under `key`.
    pub fn contains_key_anywhere(&self, key: &str) -> bool {
        self.credentials
            .keys()
            .any(|provider| self.contains_key(provider, key))
    }
}

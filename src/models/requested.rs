// src/models/requested.rs
//! A relying party's declared data requirements.

use crate::models::credential::{CredentialValue, Proof};
use crate::models::credential_object::CredentialObject;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One provider name or a list of acceptable providers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ProviderSelector {
    One(String),
    Many(Vec<String>),
}

impl ProviderSelector {
    /// The selector normalized to a list.
    pub fn names(&self) -> Vec<&str> {
        match self {
            ProviderSelector::One(name) => vec![name.as_str()],
            ProviderSelector::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }

    pub fn is(&self, provider: &str) -> bool {
        matches!(self, ProviderSelector::One(name) if name == provider)
    }
}

/// A free-form question asked by the relying party and the holder's answer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AdditionalInfo {
    pub question: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AdditionalInfo {
    pub fn is_answered(&self) -> bool {
        self.answer.as_deref().is_some_and(|answer| !answer.is_empty())
    }
}

/// What a requirement asks for: a credential key, or a set of questions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum RequestedKey {
    Name(String),
    Questions(Vec<AdditionalInfo>),
}

/// One line item of a relying party's policy.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestedCredentialKey {
    pub key: RequestedKey,

    pub provider: ProviderSelector,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<CredentialValue>,
}

impl RequestedCredentialKey {
    /// Required credential key from one provider.
    pub fn required(key: impl Into<String>, provider: impl Into<String>) -> Self {
        RequestedCredentialKey {
            key: RequestedKey::Name(key.into()),
            provider: ProviderSelector::One(provider.into()),
            name: None,
            required: true,
            expected_value: None,
        }
    }

    /// The credential key name, if this item asks for one.
    pub fn key_name(&self) -> Option<&str> {
        match &self.key {
            RequestedKey::Name(name) => Some(name),
            RequestedKey::Questions(_) => None,
        }
    }

    /// `true` if any question in this item is left unanswered.
    pub fn has_unanswered_questions(&self) -> bool {
        match &self.key {
            RequestedKey::Questions(questions) => questions.iter().any(|q| !q.is_answered()),
            RequestedKey::Name(_) => false,
        }
    }
}

/// "At least `amount` of these keys" quorum.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MinimumRequired {
    pub data: Vec<String>,
    pub amount: usize,
}

/// A relying party's declared data requirement, optionally signed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RequestedCredentials {
    /// DID of the requesting organisation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub credentials: Vec<RequestedCredentialKey>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_required: Option<MinimumRequired>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pgp_decrypt: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,
}

/// Result of checking a bundle against [`RequestedCredentials`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestedCredentialsCheckResult {
    pub success: bool,

    pub missing_keys: Vec<RequestedCredentialKey>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_message: Option<String>,

    /// The bundle, returned unchanged for inspection when the check failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<CredentialObject>,
}

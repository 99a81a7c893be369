// src/models/credential.rs
//! Signed credential data model.
//!
//! A [`Credential`] is one atomic claim ("age over 18") issued by one authority
//! about one subject and signed by that authority. The typed structs here are a
//! *reading view*: signatures are always checked against the JSON exactly as it
//! was presented, so unknown fields are kept in `extra` and survive a
//! serialization round trip.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Signature scheme tag written into every proof this crate produces.
pub const SIGNATURE_TYPE_ECDSA: &str = "ECDSA";

/// Who signed, when, and how.
///
/// `signature` is absent while the canonical payload is being signed and
/// present afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    /// Checksummed address of the signing key
    pub holder: String,

    /// Signing time in milliseconds since the Unix epoch
    pub nonce: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    /// Signature scheme, e.g. `ECDSA`
    #[serde(rename = "type")]
    pub kind: String,
}

impl Proof {
    /// Unsigned ECDSA proof for `holder` created at `nonce`.
    pub fn new(holder: impl Into<String>, nonce: i64) -> Self {
        Proof {
            holder: holder.into(),
            nonce,
            signature: None,
            kind: SIGNATURE_TYPE_ECDSA.to_string(),
        }
    }

    /// Copy of this proof with the signature removed.
    pub fn without_signature(&self) -> Self {
        Proof {
            signature: None,
            ..self.clone()
        }
    }
}

/// A date as found in credentials: ISO-8601 text or epoch milliseconds.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum DateValue {
    Millis(i64),
    Text(String),
}

impl DateValue {
    /// Interprets the value as a UTC instant.
    ///
    /// Text is tried as RFC 3339, then as a date-time without offset, then as a
    /// bare date; the last two are read as UTC.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            DateValue::Millis(millis) => DateTime::from_timestamp_millis(*millis),
            DateValue::Text(text) => {
                if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
                    return Some(parsed.with_timezone(&Utc));
                }
                if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
                    return Some(naive.and_utc());
                }
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(|naive| naive.and_utc())
            }
        }
    }
}

impl From<DateTime<Utc>> for DateValue {
    fn from(value: DateTime<Utc>) -> Self {
        DateValue::Text(value.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
    }
}

/// The value carried by a credential.
///
/// A closed set of shapes: anything else (null, mixed arrays) fails to parse.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum CredentialValue {
    /// "older than" style answers
    Bool(bool),
    Number(Number),
    /// Most values
    Text(String),
    /// Photo vectors
    List(Vec<String>),
    /// Structured data such as company information
    Object(Map<String, Value>),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CredentialClaim {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: CredentialValue,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CredentialSubject {
    pub credential: CredentialClaim,
}

/// The authority that issued a credential.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Issuer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority_name: Option<String>,

    /// DID of the issuing identity contract
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One issued claim about one subject.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub credential_subject: CredentialSubject,

    pub expiration_date: DateValue,

    /// DID of the subject's identity contract
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuance_date: Option<DateValue>,

    pub issuer: Issuer,

    /// Issuer-side proof
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,

    pub provider: String,

    #[serde(rename = "type")]
    pub types: Vec<String>,

    /// Liveness flag set by biometric checks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_credential: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Credential {
    /// `true` if the credential carries a non-empty version.
    pub fn has_version(&self) -> bool {
        self.version.as_deref().is_some_and(|version| !version.is_empty())
    }

    /// `true` if the credential expired before `now`.
    ///
    /// `None` if the expiration date cannot be interpreted.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> Option<bool> {
        self.expiration_date.to_datetime().map(|expiration| now > expiration)
    }
}

/// Reference to a signed document (certificate, contract, ...).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReference {
    pub description: String,
    pub hash: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DocumentSubject {
    pub credential: DocumentReference,
}

/// A signed statement about a document rather than about a person.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProofObject {
    pub credential_subject: DocumentSubject,
    pub expiration_date: DateValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuance_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(rename = "type")]
    pub types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    pub version: String,
}

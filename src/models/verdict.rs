// src/models/verdict.rs
//! Validation verdicts and their numeric outcome codes.

use crate::models::credential_object::CredentialObject;
use crate::models::requested::RequestedCredentialsCheckResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Numeric outcome codes. `0` is the only success.
///
/// Codes are stable wire values: user interfaces map them to remediation
/// advice ("renew your credentials" vs "re-scan the QR code").
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(into = "u16", try_from = "u16")]
pub enum ValidationCode {
    Valid,
    Invalid,
    NonceTooOld,
    UserSignatureIncorrect,
    IssuerSignatureIncorrect,
    IssuerDidIncorrect,
    UserDidIncorrect,
    CredentialExpired,
    IncorrectVersion,
    MalformedCredential,
    NoTrustedParties,
    RegistryUnavailable,
    ProviderNotAllowed,
    NoTrustClaims,
    TrustClaimExpired,
    LivenessNotVerified,
}

impl ValidationCode {
    pub const ALL: [ValidationCode; 16] = [
        ValidationCode::Valid,
        ValidationCode::Invalid,
        ValidationCode::NonceTooOld,
        ValidationCode::UserSignatureIncorrect,
        ValidationCode::IssuerSignatureIncorrect,
        ValidationCode::IssuerDidIncorrect,
        ValidationCode::UserDidIncorrect,
        ValidationCode::CredentialExpired,
        ValidationCode::IncorrectVersion,
        ValidationCode::MalformedCredential,
        ValidationCode::NoTrustedParties,
        ValidationCode::RegistryUnavailable,
        ValidationCode::ProviderNotAllowed,
        ValidationCode::NoTrustClaims,
        ValidationCode::TrustClaimExpired,
        ValidationCode::LivenessNotVerified,
    ];

    pub fn code(self) -> u16 {
        match self {
            ValidationCode::Valid => 0,
            ValidationCode::Invalid => 1,
            ValidationCode::NonceTooOld => 2,
            ValidationCode::UserSignatureIncorrect => 3,
            ValidationCode::IssuerSignatureIncorrect => 4,
            ValidationCode::IssuerDidIncorrect => 5,
            ValidationCode::UserDidIncorrect => 6,
            ValidationCode::CredentialExpired => 7,
            ValidationCode::IncorrectVersion => 8,
            ValidationCode::MalformedCredential => 9,
            ValidationCode::NoTrustedParties => 10,
            ValidationCode::RegistryUnavailable => 11,
            ValidationCode::ProviderNotAllowed => 12,
            ValidationCode::NoTrustClaims => 13,
            ValidationCode::TrustClaimExpired => 14,
            ValidationCode::LivenessNotVerified => 15,
        }
    }

    /// Default human-readable message for this code.
    pub fn message(self) -> &'static str {
        match self {
            ValidationCode::Valid => "Valid credential",
            ValidationCode::Invalid => "Invalid credential",
            ValidationCode::NonceTooOld => "Nonce too old",
            ValidationCode::UserSignatureIncorrect => "User signature incorrect",
            ValidationCode::IssuerSignatureIncorrect => "Issuer signature incorrect",
            ValidationCode::IssuerDidIncorrect => "Issuer did incorrect",
            ValidationCode::UserDidIncorrect => "User did incorrect",
            ValidationCode::CredentialExpired => "Credential expired. Renew your credentials",
            ValidationCode::IncorrectVersion => "Incorrect credential version. Renew your credentials",
            ValidationCode::MalformedCredential => "Malformed credential",
            ValidationCode::NoTrustedParties => "No trusted parties to check.",
            ValidationCode::RegistryUnavailable => "Identity registry unavailable. Try again later",
            ValidationCode::ProviderNotAllowed => "Provider was not allowed to issue this attribute",
            ValidationCode::NoTrustClaims => "No claims found to check",
            ValidationCode::TrustClaimExpired => "Claim expired.",
            ValidationCode::LivenessNotVerified => "Liveness check required but credential not verified",
        }
    }
}

impl From<ValidationCode> for u16 {
    fn from(code: ValidationCode) -> Self {
        code.code()
    }
}

impl TryFrom<u16> for ValidationCode {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        ValidationCode::ALL
            .into_iter()
            .find(|code| code.code() == value)
            .ok_or_else(|| format!("unknown validation code {}", value))
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}

/// One credential (or provider group) that failed a check.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InvalidCredential {
    /// The failing entry exactly as presented
    pub credential: Value,
    pub code: ValidationCode,
    pub message: String,
}

impl InvalidCredential {
    pub fn new(credential: Value, code: ValidationCode) -> Self {
        InvalidCredential {
            credential,
            code,
            message: code.message().to_string(),
        }
    }

    pub fn with_message(credential: Value, code: ValidationCode, message: impl Into<String>) -> Self {
        InvalidCredential {
            credential,
            code,
            message: message.into(),
        }
    }
}

/// The verdict of a validation call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedCredentials {
    pub valid: bool,

    pub code: ValidationCode,

    pub message: String,

    /// The canonical bundle, present on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<CredentialObject>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invalid_credentials: Vec<InvalidCredential>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_check_result: Option<RequestedCredentialsCheckResult>,
}

impl ValidatedCredentials {
    pub fn valid(credentials: CredentialObject) -> Self {
        ValidatedCredentials {
            valid: true,
            code: ValidationCode::Valid,
            message: ValidationCode::Valid.message().to_string(),
            credentials: Some(credentials),
            invalid_credentials: Vec::new(),
            requested_check_result: None,
        }
    }

    pub fn invalid(code: ValidationCode, message: impl Into<String>, invalid_credentials: Vec<InvalidCredential>) -> Self {
        ValidatedCredentials {
            valid: false,
            code,
            message: message.into(),
            credentials: None,
            invalid_credentials,
            requested_check_result: None,
        }
    }

    /// Aggregate verdict over a list of failures.
    ///
    /// Any infrastructure failure makes the whole verdict
    /// [`ValidationCode::RegistryUnavailable`] so callers can retry.
    pub fn from_failures(invalid_credentials: Vec<InvalidCredential>) -> Self {
        let code = if invalid_credentials
            .iter()
            .any(|entry| entry.code == ValidationCode::RegistryUnavailable)
        {
            ValidationCode::RegistryUnavailable
        } else {
            ValidationCode::Invalid
        };
        Self::invalid(code, code.message(), invalid_credentials)
    }

    /// Codes of all failing entries, in order.
    pub fn invalid_codes(&self) -> Vec<ValidationCode> {
        self.invalid_credentials.iter().map(|entry| entry.code).collect()
    }
}

/// Outcome of the full pipeline: either the policy gate rejected the bundle,
/// or cryptographic validation produced a verdict.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ValidationOutcome {
    Rejected(RequestedCredentialsCheckResult),
    Validated(ValidatedCredentials),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Validated(verdict) if verdict.valid)
    }

    pub fn verdict(&self) -> Option<&ValidatedCredentials> {
        match self {
            ValidationOutcome::Validated(verdict) => Some(verdict),
            ValidationOutcome::Rejected(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_codes_are_distinct_and_round_trip() {
        for (expected, code) in ValidationCode::ALL.into_iter().enumerate() {
            assert_eq!(code.code() as usize, expected);
            assert_eq!(ValidationCode::try_from(code.code()).unwrap(), code);
        }
        assert!(ValidationCode::try_from(16).is_err());
    }

    #[test]
    fn test_code_serializes_as_number() {
        let entry = InvalidCredential::new(json!({}), ValidationCode::IssuerSignatureIncorrect);
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["code"], json!(4));
        let parsed: InvalidCredential = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn test_registry_failures_dominate_aggregate_code() {
        let verdict = ValidatedCredentials::from_failures(vec![
            InvalidCredential::new(json!({}), ValidationCode::CredentialExpired),
            InvalidCredential::new(json!({}), ValidationCode::RegistryUnavailable),
        ]);
        assert_eq!(verdict.code, ValidationCode::RegistryUnavailable);

        let verdict = ValidatedCredentials::from_failures(vec![InvalidCredential::new(
            json!({}),
            ValidationCode::CredentialExpired,
        )]);
        assert_eq!(verdict.code, ValidationCode::Invalid);
        assert!(!verdict.valid);
    }
}

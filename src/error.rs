// src/error.rs
//! Error types for the credential trust engine.
//!
//! Expected validation failures (bad signatures, expired credentials, missing
//! authorizations) are *not* errors: they are reported as numeric
//! [`ValidationCode`](crate::models::verdict::ValidationCode)s inside a verdict.
//! The types here cover the cases where the engine itself could not do its job.

use std::time::Duration;
use thiserror::Error;

/// Failures talking to an identity contract or interpreting what it returned.
///
/// These are infrastructure failures: a caller should retry instead of
/// rejecting the presented credentials.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid RPC endpoint `{0}`")]
    InvalidEndpoint(String),

    #[error("identity contract ABI could not be loaded: {0}")]
    Abi(String),

    #[error("could not encode call to `{method}`: {reason}")]
    Encode { method: &'static str, reason: String },

    #[error("RPC call `{method}` failed: {reason}")]
    Rpc { method: &'static str, reason: String },

    #[error("could not decode `{method}` output: {reason}")]
    Decode { method: &'static str, reason: String },

    #[error("claim data is not a valid JSON document: {0}")]
    MalformedClaim(String),

    #[error("identity registry unavailable: {0}")]
    Unavailable(String),
}

/// Failures producing or parsing signatures.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid signature `{0}`")]
    InvalidSignature(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A DID string that does not have the supported `did:<chain>:<address>` form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DidError {
    #[error("unsupported did `{0}`")]
    Unsupported(String),
}

/// Failures of a whole validation call.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("credential bundle could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("validation did not finish within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Configuration could not be loaded.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

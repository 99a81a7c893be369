// src/models/challenge.rs
//! Signed handshake challenges used to prove control of a key.

use serde::{Deserialize, Serialize};

/// A challenge string signed with the key behind `public_key`.
///
/// The challenge text is `"<publicKey>-<did>-<endpoint>-<timestamp>"` and is
/// signed as a plain personal message (it is not JSON, so it is not
/// canonicalized).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub did: String,
    pub public_key: String,
    pub endpoint: String,
    /// Unix seconds, as text
    pub timestamp: String,
    pub challenge: String,
    pub signature: String,
}

impl Challenge {
    /// Builds the challenge text from its parts.
    pub fn compose(public_key: &str, did: &str, endpoint: &str, timestamp: &str) -> String {
        format!("{}-{}-{}-{}", public_key, did, endpoint, timestamp)
    }

    /// `true` if `challenge` is exactly the composition of the other fields.
    pub fn is_consistent(&self) -> bool {
        self.challenge == Self::compose(&self.public_key, &self.did, &self.endpoint, &self.timestamp)
    }
}

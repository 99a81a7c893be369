// src/wallet/signature.rs
//! Signature recovery.
//!
//! Signatures are 65-byte `r || s || v` ECDSA (secp256k1) signatures over an
//! Ethereum personal message, hex encoded with a `0x` prefix. Verification
//! never compares public keys directly: it recovers the signer's address and
//! compares it with the claimed one.

use crate::error::SignatureError;
use crate::models::challenge::Challenge;
use crate::utils::crypto::checksum_address;
use crate::utils::serialization::to_canonical_string;
use ethers::types::Signature;
use serde::Serialize;
use serde_json::Value;
use std::str::FromStr;

/// Parses a hex signature, with or without `0x`.
pub fn parse_signature(signature: &str) -> Result<Signature, SignatureError> {
    Signature::from_str(signature).map_err(|_| SignatureError::InvalidSignature(signature.to_string()))
}

/// Recovers the checksummed address that signed `message` as a personal message.
pub fn recover_signer(message: &str, signature: &str) -> Result<String, SignatureError> {
    let parsed = parse_signature(signature)?;
    let address = parsed
        .recover(message)
        .map_err(|e| SignatureError::InvalidSignature(e.to_string()))?;
    Ok(checksum_address(&address))
}

/// Recovers the signer of the canonical JSON form of `payload`.
pub fn recover_canonical_signer<T: Serialize + ?Sized>(
    payload: &T,
    signature: &str,
) -> Result<String, SignatureError> {
    recover_signer(&to_canonical_string(payload)?, signature)
}

/// Recovers the signer of `message`.
///
/// With `canonicalize`, `message` is parsed as JSON and its canonical form is
/// what gets checked; otherwise the text is checked as-is.
pub fn recover_address_from_signature(
    message: &str,
    signature: &str,
    canonicalize: bool,
) -> Result<String, SignatureError> {
    if canonicalize {
        let value: Value = serde_json::from_str(message)?;
        recover_canonical_signer(&value, signature)
    } else {
        recover_signer(message, signature)
    }
}

/// Exact comparison of a claimed signer with a recovered one.
pub fn signature_matches(claimed_holder: &str, recovered: &str) -> bool {
    claimed_holder == recovered
}

/// `true` if `signature` over the canonical form of `payload` was made by
/// `claimed_holder`. Unparseable signatures simply do not match.
pub fn verify_canonical<T: Serialize + ?Sized>(payload: &T, claimed_holder: &str, signature: &str) -> bool {
    match to_canonical_string(payload) {
        Ok(message) => verify_message(&message, claimed_holder, signature),
        Err(err) => {
            log::debug!("payload of {} could not be serialized: {}", claimed_holder, err);
            false
        }
    }
}

/// `true` if `signature` over exactly `message` was made by `claimed_holder`.
pub fn verify_message(message: &str, claimed_holder: &str, signature: &str) -> bool {
    match recover_signer(message, signature) {
        Ok(recovered) if signature_matches(claimed_holder, &recovered) => true,
        Ok(recovered) => {
            log::debug!(
                "signature of {} does not match recovered address {}",
                claimed_holder,
                recovered
            );
            false
        }
        Err(err) => {
            log::debug!("signature of {} could not be recovered: {}", claimed_holder, err);
            false
        }
    }
}

/// Checks that a challenge is well formed and signed by its `public_key`.
pub fn verify_challenge(challenge: &Challenge) -> bool {
    if !challenge.is_consistent() {
        return false;
    }
    matches!(
        recover_signer(&challenge.challenge, &challenge.signature),
        Ok(recovered) if signature_matches(&challenge.public_key, &recovered)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // Personal-message signature of "Some data" by
    // 0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318
    const KNOWN_SIGNATURE: &str = "0xb91467e570a6466aa9e9876cbcd013baba02900b8979d43fe208a4a4f339f5fd6007e74cd82e037b800186422fc2da167c747ef045e5d18a5f5d4300f8e1a0291c";
    const KNOWN_ADDRESS: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";

    #[test]
    fn test_recovers_wallet_compatible_signature() {
        assert_eq!(recover_signer("Some data", KNOWN_SIGNATURE).unwrap(), KNOWN_ADDRESS);
        assert_ne!(recover_signer("Some data!", KNOWN_SIGNATURE).unwrap(), KNOWN_ADDRESS);
    }

    #[test]
    fn test_invalid_signature_is_an_error_not_a_panic() {
        assert!(matches!(
            recover_signer("Some data", "0x1234"),
            Err(SignatureError::InvalidSignature(_))
        ));
        assert!(recover_signer("Some data", "not hex").is_err());
        assert!(!verify_canonical(&json!({}), KNOWN_ADDRESS, "0x00"));
        assert!(verify_message("Some data", KNOWN_ADDRESS, KNOWN_SIGNATURE));
        assert!(!verify_message("Some data", KNOWN_ADDRESS, "0x00"));
    }

    #[test]
    fn test_recover_address_with_and_without_canonical_form() {
        assert_eq!(
            recover_address_from_signature("Some data", KNOWN_SIGNATURE, false).unwrap(),
            KNOWN_ADDRESS
        );
        assert!(matches!(
            recover_address_from_signature("Some data", KNOWN_SIGNATURE, true),
            Err(SignatureError::Serialization(_))
        ));
        assert_eq!(
            recover_address_from_signature(r#"{"b":1,"a":2}"#, KNOWN_SIGNATURE, true).unwrap(),
            recover_signer(r#"{"a":2,"b":1}"#, KNOWN_SIGNATURE).unwrap()
        );
    }

    #[test]
    fn test_signature_matches_is_exact() {
        assert!(signature_matches(KNOWN_ADDRESS, KNOWN_ADDRESS));
        assert!(!signature_matches(&KNOWN_ADDRESS.to_lowercase(), KNOWN_ADDRESS));
    }
}

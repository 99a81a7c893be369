// src/wallet/key_management.rs
//! Signing facility for holders, issuers and relying parties.
//!
//! Every structured payload is canonicalized before signing so the verifier,
//! which canonicalizes too, rebuilds exactly the signed bytes. Holder groups
//! use [`CredentialObject::group_signing_text`]. Uses:
//! - secp256k1 keys (via the `k256` crate)
//! - Ethereum personal-message hashing and signatures (via `ethers`)

use crate::error::SignatureError;
use crate::models::challenge::Challenge;
use crate::models::credential::{Credential, Proof, ProofObject};
use crate::models::credential_object::{CredentialKeyObject, CredentialObject};
use crate::models::requested::RequestedCredentials;
use crate::utils::crypto::checksum_address;
use crate::utils::serialization::to_canonical_string;
use ethers::signers::{LocalWallet, Signer};
use ethers::utils::{hash_message, hex};
use k256::ecdsa::SigningKey;
use serde::Serialize;

/// Holds one private key and signs with it.
///
/// Key generation is not part of this crate: keys come from the caller's
/// wallet as hex or as a `k256` signing key.
#[derive(Clone)]
pub struct KeyManager {
    wallet: LocalWallet,
}

impl KeyManager {
    /// Creates a key manager from a hex private key (with or without `0x`).
    pub fn from_private_key(private_key: &str) -> Result<Self, SignatureError> {
        let digits = private_key.strip_prefix("0x").unwrap_or(private_key);
        let bytes = hex::decode(digits).map_err(|e| SignatureError::InvalidPrivateKey(e.to_string()))?;
        let signing_key =
            SigningKey::from_slice(&bytes).map_err(|e| SignatureError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self::from_signing_key(signing_key))
    }

    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        KeyManager {
            wallet: LocalWallet::from(signing_key),
        }
    }

    /// Checksummed address of this key: its public identity.
    pub fn address(&self) -> String {
        checksum_address(&self.wallet.address())
    }

    /// Signs `message` as-is as an Ethereum personal message.
    pub fn sign_message(&self, message: &str) -> Result<String, SignatureError> {
        let signature = self
            .wallet
            .sign_hash(hash_message(message))
            .map_err(|e| SignatureError::Signing(e.to_string()))?;
        Ok(format!("0x{}", hex::encode(signature.to_vec())))
    }

    /// Canonicalizes, serializes and signs `payload`.
    pub fn sign<T: Serialize + ?Sized>(&self, payload: &T) -> Result<String, SignatureError> {
        self.sign_message(&to_canonical_string(payload)?)
    }

    /// Issuer side: attaches a fresh proof to `credential` and signs it.
    pub fn sign_credential(&self, credential: &mut Credential, nonce: i64) -> Result<(), SignatureError> {
        credential.proof = Some(Proof::new(self.address(), nonce));
        let signature = self.sign(credential)?;
        if let Some(proof) = credential.proof.as_mut() {
            proof.signature = Some(signature);
        }
        Ok(())
    }

    /// Holder side: signs one provider group of a bundle.
    pub fn sign_credential_group(
        &self,
        provider: &str,
        group: &mut CredentialKeyObject,
        nonce: i64,
    ) -> Result<(), SignatureError> {
        group.proof = Some(Proof::new(self.address(), nonce));
        let signature = self.sign_message(&CredentialObject::group_signing_text(provider, group)?)?;
        if let Some(proof) = group.proof.as_mut() {
            proof.signature = Some(signature);
        }
        Ok(())
    }

    /// Holder side: signs every provider group of a bundle.
    pub fn sign_credential_object(&self, bundle: &mut CredentialObject, nonce: i64) -> Result<(), SignatureError> {
        for (provider, group) in bundle.credentials.iter_mut() {
            self.sign_credential_group(provider, group, nonce)?;
        }
        Ok(())
    }

    /// Relying-party side: signs a data request.
    pub fn sign_requested_credentials(
        &self,
        requested: &mut RequestedCredentials,
        nonce: i64,
    ) -> Result<(), SignatureError> {
        requested.proof = Some(Proof::new(self.address(), nonce));
        let signature = self.sign(requested)?;
        if let Some(proof) = requested.proof.as_mut() {
            proof.signature = Some(signature);
        }
        Ok(())
    }

    /// Signs a document proof-object.
    pub fn sign_proof_object(&self, object: &mut ProofObject, nonce: i64) -> Result<(), SignatureError> {
        object.proof = Some(Proof::new(self.address(), nonce));
        let signature = self.sign(object)?;
        if let Some(proof) = object.proof.as_mut() {
            proof.signature = Some(signature);
        }
        Ok(())
    }

    /// Builds and signs a handshake challenge for `did` at `host`.
    pub fn generate_challenge(&self, did: &str, host: &str, unix_seconds: i64) -> Result<Challenge, SignatureError> {
        let public_key = self.address();
        let timestamp = unix_seconds.to_string();
        let challenge = Challenge::compose(&public_key, did, host, &timestamp);
        let signature = self.sign_message(&challenge)?;
        Ok(Challenge {
            did: did.to_string(),
            public_key,
            endpoint: host.to_string(),
            timestamp,
            challenge,
            signature,
        })
    }
}

/// Checksummed address belonging to a hex private key.
pub fn private_key_to_address(private_key: &str) -> Result<String, SignatureError> {
    Ok(KeyManager::from_private_key(private_key)?.address())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credential::{DateValue, DocumentReference, DocumentSubject};
    use crate::wallet::signature::{recover_canonical_signer, recover_signer, verify_canonical, verify_challenge};
    use serde_json::json;

    const KNOWN_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    fn random_key() -> KeyManager {
        KeyManager::from_signing_key(SigningKey::random(&mut rand::thread_rng()))
    }

    #[test]
    fn test_known_key_matches_wallets() {
        let key = KeyManager::from_private_key(KNOWN_KEY).unwrap();
        assert_eq!(key.address(), "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23");
        assert_eq!(
            key.sign_message("Some data").unwrap(),
            "0xb91467e570a6466aa9e9876cbcd013baba02900b8979d43fe208a4a4f339f5fd6007e74cd82e037b800186422fc2da167c747ef045e5d18a5f5d4300f8e1a0291c"
        );
        assert_eq!(private_key_to_address(&KNOWN_KEY[2..]).unwrap(), key.address());
    }

    #[test]
    fn test_rejects_bad_private_keys() {
        assert!(KeyManager::from_private_key("0x1234").is_err());
        assert!(KeyManager::from_private_key("zz").is_err());
    }

    #[test]
    fn test_sign_recover_round_trip_is_order_independent() {
        let key = random_key();
        let payload = json!({"b": 1, "A": {"y": true, "x": [2, 1]}});
        let reordered = json!({"A": {"x": [2, 1], "y": true}, "b": 1});
        let signature = key.sign(&payload).unwrap();

        assert_eq!(recover_canonical_signer(&reordered, &signature).unwrap(), key.address());
        assert!(verify_canonical(&payload, &key.address(), &signature));
        assert!(!verify_canonical(&json!({"b": 2, "A": {"y": true, "x": [2, 1]}}), &key.address(), &signature));
    }

    #[test]
    fn test_signed_requested_credentials_verify_without_signature() {
        let key = random_key();
        let mut requested = RequestedCredentials {
            id: Some("did:didux:0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".into()),
            ..Default::default()
        };
        key.sign_requested_credentials(&mut requested, 1_700_000_000_000).unwrap();

        let proof = requested.proof.clone().unwrap();
        let mut unsigned = requested.clone();
        unsigned.proof = Some(proof.without_signature());
        assert_eq!(proof.holder, key.address());
        assert!(verify_canonical(&unsigned, &proof.holder, proof.signature.as_deref().unwrap()));
    }

    #[test]
    fn test_signed_proof_object_recovers_its_holder() {
        let key = random_key();
        let mut object = ProofObject {
            credential_subject: DocumentSubject {
                credential: DocumentReference {
                    description: "Employment contract".into(),
                    hash: "0x9c22ff5f21f0b81b113e63f7db6da94fedef11b2119b4088b89664fb9a3cb658".into(),
                    link: "https://proofme.id/documents/1".into(),
                    template: None,
                    kind: "CONTRACT".into(),
                },
            },
            expiration_date: DateValue::Text("2030-01-01T00:00:00.000Z".into()),
            id: None,
            issuance_date: Some(1_700_000_000_000),
            proof: None,
            tx_hash: None,
            types: vec!["VerifiableCredential".into(), "CONTRACT".into()],
            verified: None,
            version: "1.0.0".into(),
        };
        key.sign_proof_object(&mut object, 1_700_000_000_000).unwrap();

        let proof = object.proof.clone().unwrap();
        let mut unsigned = object.clone();
        unsigned.proof = Some(proof.without_signature());
        assert_eq!(
            recover_canonical_signer(&unsigned, proof.signature.as_deref().unwrap()).unwrap(),
            key.address()
        );

        unsigned.credential_subject.credential.hash = "0x00".into();
        assert!(!verify_canonical(&unsigned, &key.address(), proof.signature.as_deref().unwrap()));
    }

    #[test]
    fn test_challenge_round_trip() {
        let key = random_key();
        let challenge = key
            .generate_challenge("did:didux:0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed", "proofme.id", 1_700_000_000)
            .unwrap();
        assert_eq!(
            challenge.challenge,
            format!("{}-did:didux:0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed-proofme.id-1700000000", key.address())
        );
        assert_eq!(recover_signer(&challenge.challenge, &challenge.signature).unwrap(), key.address());
        assert!(verify_challenge(&challenge));

        let mut tampered = challenge.clone();
        tampered.endpoint = "evil.example".into();
        assert!(!verify_challenge(&tampered));
    }
}

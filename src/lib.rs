// src/lib.rs

//! # Credential Trust Engine
//!
//! Decides whether a bundle of signed identity credentials can be trusted
//! before a relying party acts on it.
//!
//! ## Architecture Overview
//! 1. **Blockchain Layer**: `EvmClient` for read-only calls to an EVM node
//! 2. **Contracts Layer**: the `IdentityRegistry` view of identity contracts
//! 3. **Services Layer**: key authorization, trust chains, policy and the `Verifier`
//! 4. **Wallet Layer**: signing and signature recovery
//!
//! ## Environment Variables
//! - `CREDENTIAL_TRUST_RPC_URL`: JSON-RPC endpoint (default: http://localhost:8545)
//! - `CREDENTIAL_TRUST_RPC_TIMEOUT_SECS`: bound for one validation call
//! - `CREDENTIAL_TRUST_NONCE_WINDOW_SECS`: maximum holder nonce age (default: 300)
//! - `CREDENTIAL_TRUST_EXCLUDED_PROVIDERS`: comma separated self-asserted providers
//! - `CREDENTIAL_TRUST_COMPANY_INFO_CLAIM_TYPE`: claim type of organisation licences

// Module declarations (organized by functional domain)
pub mod blockchain; // EVM JSON-RPC access
pub mod contracts;  // Identity contract bindings
pub mod error;      // Error types
pub mod models;     // Data structures
pub mod services;   // Validation logic
pub mod settings;   // Configuration
pub mod utils;      // Helper functions
pub mod wallet;     // Signing and recovery

pub use contracts::identity_registry::{ClaimHolderRegistry, IdentityRegistry};
pub use contracts::memory::InMemoryRegistry;
pub use error::{DidError, RegistryError, SettingsError, SignatureError, ValidationError};
pub use models::credential_object::{CredentialKeyObject, CredentialObject};
pub use models::requested::{RequestedCredentials, RequestedCredentialsCheckResult};
pub use models::verdict::{InvalidCredential, ValidatedCredentials, ValidationCode, ValidationOutcome};
pub use services::organisation::OrganisationVerifier;
pub use services::verifier::{ValidationOptions, Verifier};
pub use settings::Settings;
pub use utils::serialization::canonicalize;
pub use wallet::key_management::KeyManager;
pub use wallet::signature::recover_address_from_signature;

// src/services/verifier.rs
//! Credential bundle validation.
//!
//! The [`Verifier`] drives every check a relying party needs before trusting a
//! presented bundle:
//! 1. the relying party's policy (if given)
//! 2. per provider, the holder's signature over the provider group
//! 3. per credential: version, expiration, nonce freshness, issuer signature,
//!    issuer key authorization, holder key authorization, liveness
//! 4. third-party endorsement of the issuers (if trusted parties are given)
//!
//! Expected failures become [`ValidationCode`]s in the verdict. Only
//! infrastructure trouble (an unserializable bundle, a timeout) is an `Err`.

use crate::contracts::identity_registry::{ClaimHolderRegistry, IdentityRegistry};
use crate::error::{RegistryError, ValidationError};
use crate::models::credential::{Credential, Proof};
use crate::models::credential_object::{CredentialKeyObject, CredentialObject, SELF_ASSERTED_PROVIDERS};
use crate::models::requested::RequestedCredentials;
use crate::models::verdict::{InvalidCredential, ValidatedCredentials, ValidationCode, ValidationOutcome};
use crate::services::authorization::IdentityAuthorizer;
use crate::services::policy::check_requested_credentials;
use crate::services::trust_chain::{describe_identities, filter_trusted_identities, TrustChainResolver, TrustDecision};
use crate::settings::Settings;
use crate::wallet::signature::{verify_canonical, verify_message};
use chrono::{DateTime, Utc};
use ethers::types::Address;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Default maximum age of a holder's nonce.
pub const DEFAULT_NONCE_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Caller-controlled switches for one validation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Reject bundles whose holder nonce is outside the nonce window.
    /// Disabled by flows that reuse an older signed bundle.
    pub check_nonce: bool,

    /// Reject credentials explicitly marked `verified: false`.
    pub liveness_required: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        ValidationOptions {
            check_nonce: true,
            liveness_required: false,
        }
    }
}

/// Validates credential bundles against on-chain identity contracts.
///
/// Holds no per-call state: authorization and trust claim caches live for a
/// single call, so one `Verifier` can serve concurrent validations.
pub struct Verifier<R: IdentityRegistry + ?Sized> {
    /// Identity contract reader
    registry: Arc<R>,
    /// Providers whose contents are never verified
    excluded_providers: Vec<String>,
    nonce_window: Duration,
    /// Bound for a whole [`Verifier::is_valid_credentials`] call
    timeout: Option<Duration>,
}

impl Verifier<ClaimHolderRegistry> {
    /// Builds a verifier talking to the JSON-RPC endpoint in `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self, RegistryError> {
        let registry = ClaimHolderRegistry::connect(&settings.rpc_url)?;
        Ok(Verifier::new(Arc::new(registry))
            .with_excluded_providers(settings.excluded_providers.clone())
            .with_nonce_window(settings.nonce_window())
            .with_timeout(settings.rpc_timeout()))
    }
}

impl<R: IdentityRegistry + ?Sized> Verifier<R> {
    /// Verifier with the default nonce window, the self-asserted providers
    /// excluded and no timeout.
    pub fn new(registry: Arc<R>) -> Self {
        Verifier {
            registry,
            excluded_providers: SELF_ASSERTED_PROVIDERS.iter().map(|p| p.to_string()).collect(),
            nonce_window: DEFAULT_NONCE_WINDOW,
            timeout: None,
        }
    }

    pub fn with_excluded_providers(mut self, excluded_providers: Vec<String>) -> Self {
        self.excluded_providers = excluded_providers;
        self
    }

    pub fn with_nonce_window(mut self, nonce_window: Duration) -> Self {
        self.nonce_window = nonce_window;
        self
    }

    /// Bounds every [`Verifier::is_valid_credentials`] call; `None` removes the bound.
    pub fn with_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.timeout = timeout.into();
        self
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    fn is_excluded(&self, provider: &str) -> bool {
        self.excluded_providers.iter().any(|excluded| excluded == provider)
    }

    /// Full evaluation of a presented bundle.
    ///
    /// # Arguments
    /// * `bundle` - The credentials as presented by the holder
    /// * `requested` - The relying party's policy; checked first
    /// * `trusted` - Addresses of trusted parties whose endorsement of each
    ///   issuer is required. `None` skips the endorsement check
    /// * `options` - Nonce and liveness switches
    ///
    /// # Returns
    /// - `ValidationOutcome::Rejected` if the policy is not met; the bundle is
    ///   returned unchanged inside
    /// - `ValidationOutcome::Validated` with the verdict otherwise
    ///
    /// # Errors
    /// [`ValidationError::Timeout`] if the configured timeout elapses.
    pub async fn is_valid_credentials(
        &self,
        bundle: &CredentialObject,
        requested: Option<&RequestedCredentials>,
        trusted: Option<&[String]>,
        options: ValidationOptions,
    ) -> Result<ValidationOutcome, ValidationError> {
        let validation = self.validate_at(bundle, requested, trusted, options, Utc::now());
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, validation)
                .await
                .map_err(|_| ValidationError::Timeout(limit))?,
            None => validation.await,
        }
    }

    /// [`Verifier::is_valid_credentials`] evaluated at a fixed instant, without timeout.
    pub async fn validate_at(
        &self,
        bundle: &CredentialObject,
        requested: Option<&RequestedCredentials>,
        trusted: Option<&[String]>,
        options: ValidationOptions,
        now: DateTime<Utc>,
    ) -> Result<ValidationOutcome, ValidationError> {
        let requested_check_result = match requested {
            Some(requested) => {
                let result = check_requested_credentials(bundle, requested);
                if !result.success {
                    return Ok(ValidationOutcome::Rejected(result));
                }
                Some(result)
            }
            None => None,
        };

        let mut verdict = self.check_credentials_at(bundle, options, now).await?;
        if verdict.valid {
            if let Some(trusted) = trusted {
                verdict = self.check_trusted_parties_at(bundle, trusted, now).await?;
            }
        }
        if verdict.valid {
            verdict.requested_check_result = requested_check_result;
        }

        log::info!(
            "credential bundle validated: valid={} code={} invalid={:?}",
            verdict.valid,
            verdict.code.code(),
            verdict.invalid_codes()
        );
        Ok(ValidationOutcome::Validated(verdict))
    }

    /// Cryptographic, temporal and authorization checks of every credential.
    pub async fn check_credentials(
        &self,
        bundle: &CredentialObject,
        options: ValidationOptions,
    ) -> Result<ValidatedCredentials, ValidationError> {
        self.check_credentials_at(bundle, options, Utc::now()).await
    }

    /// [`Verifier::check_credentials`] evaluated at `now`.
    pub async fn check_credentials_at(
        &self,
        bundle: &CredentialObject,
        options: ValidationOptions,
        now: DateTime<Utc>,
    ) -> Result<ValidatedCredentials, ValidationError> {
        let bundle = bundle.canonical()?;
        let mut authorizer = IdentityAuthorizer::new(self.registry.as_ref());
        let mut tally = Tally::default();

        for (provider, group) in bundle.credentials.iter().filter(|(provider, _)| !self.is_excluded(provider)) {
            let Some(holder_proof) = verified_holder_proof(provider, group)? else {
                log::debug!("holder signature of provider {} is incorrect", provider);
                tally.reject_group(group, ValidationCode::UserSignatureIncorrect);
                continue;
            };

            for entry in group.credentials.values() {
                match self
                    .check_credential(entry, holder_proof, options, now, &mut authorizer)
                    .await
                {
                    Ok(None) => tally.pass(),
                    Ok(Some(invalid)) => tally.fail(invalid),
                    Err(err) => {
                        log::warn!("registry lookup failed for provider {}: {}", provider, err);
                        tally.fail(InvalidCredential::with_message(
                            entry.clone(),
                            ValidationCode::RegistryUnavailable,
                            err.to_string(),
                        ));
                    }
                }
            }
        }

        Ok(tally.into_verdict(bundle))
    }

    async fn check_credential(
        &self,
        entry: &Value,
        holder_proof: &Proof,
        options: ValidationOptions,
        now: DateTime<Utc>,
        authorizer: &mut IdentityAuthorizer<'_, R>,
    ) -> Result<Option<InvalidCredential>, RegistryError> {
        let credential: Credential = match serde_json::from_value(entry.clone()) {
            Ok(credential) => credential,
            Err(err) => return Ok(Some(malformed(entry, err))),
        };

        if !credential.has_version() {
            return Ok(Some(InvalidCredential::new(entry.clone(), ValidationCode::IncorrectVersion)));
        }

        match (credential.is_expired_at(now), credential.expiration_date.to_datetime()) {
            (Some(false), _) => {}
            (Some(true), Some(expiration)) => {
                return Ok(Some(InvalidCredential::with_message(
                    entry.clone(),
                    ValidationCode::CredentialExpired,
                    format!("Your credential expired on {}", expiration.to_rfc3339()),
                )))
            }
            _ => return Ok(Some(malformed(entry, "unreadable expirationDate"))),
        }

        if options.check_nonce && !self.is_fresh(holder_proof.nonce, now) {
            return Ok(Some(InvalidCredential::new(entry.clone(), ValidationCode::NonceTooOld)));
        }

        let issuer_key = match &credential.proof {
            Some(proof) if issuer_signature_matches(entry, proof) => proof.holder.as_str(),
            _ => {
                return Ok(Some(InvalidCredential::new(
                    entry.clone(),
                    ValidationCode::IssuerSignatureIncorrect,
                )))
            }
        };

        if !authorizer.is_authorized_for_did(issuer_key, &credential.issuer.id).await? {
            return Ok(Some(InvalidCredential::new(entry.clone(), ValidationCode::IssuerDidIncorrect)));
        }

        if !authorizer.is_authorized_for_did(&holder_proof.holder, &credential.id).await? {
            return Ok(Some(InvalidCredential::new(entry.clone(), ValidationCode::UserDidIncorrect)));
        }

        if options.liveness_required && credential.verified == Some(false) {
            return Ok(Some(InvalidCredential::new(entry.clone(), ValidationCode::LivenessNotVerified)));
        }

        Ok(None)
    }

    /// `|now - nonce|` within the nonce window, to the millisecond.
    fn is_fresh(&self, nonce: i64, now: DateTime<Utc>) -> bool {
        let age = now.timestamp_millis().abs_diff(nonce);
        u128::from(age) <= self.nonce_window.as_millis()
    }

    /// Third-party endorsement of every credential's issuer.
    pub async fn check_trusted_parties(
        &self,
        bundle: &CredentialObject,
        trusted: &[String],
    ) -> Result<ValidatedCredentials, ValidationError> {
        self.check_trusted_parties_at(bundle, trusted, Utc::now()).await
    }

    /// [`Verifier::check_trusted_parties`] evaluated at `now`.
    ///
    /// Entries of `trusted` that are not addresses are ignored; if none is
    /// left the verdict is [`ValidationCode::NoTrustedParties`].
    pub async fn check_trusted_parties_at(
        &self,
        bundle: &CredentialObject,
        trusted: &[String],
        now: DateTime<Utc>,
    ) -> Result<ValidatedCredentials, ValidationError> {
        let trusted = filter_trusted_identities(trusted);
        if trusted.is_empty() {
            let code = ValidationCode::NoTrustedParties;
            return Ok(ValidatedCredentials::invalid(code, code.message(), Vec::new()));
        }

        let bundle = bundle.canonical()?;
        let mut resolver = TrustChainResolver::new(self.registry.as_ref());
        let mut tally = Tally::default();

        for (_, group) in bundle.credentials.iter().filter(|(provider, _)| !self.is_excluded(provider)) {
            for (key, entry) in &group.credentials {
                match check_endorsement(entry, key, &trusted, now, &mut resolver).await {
                    Ok(None) => tally.pass(),
                    Ok(Some(invalid)) => tally.fail(invalid),
                    Err(err) => {
                        log::warn!("trust claim lookup failed for {}: {}", key, err);
                        tally.fail(InvalidCredential::with_message(
                            entry.clone(),
                            ValidationCode::RegistryUnavailable,
                            err.to_string(),
                        ));
                    }
                }
            }
        }

        Ok(tally.into_verdict(bundle))
    }
}

async fn check_endorsement<R: IdentityRegistry + ?Sized>(
    entry: &Value,
    key: &str,
    trusted: &[Address],
    now: DateTime<Utc>,
    resolver: &mut TrustChainResolver<'_, R>,
) -> Result<Option<InvalidCredential>, RegistryError> {
    let credential: Credential = match serde_json::from_value(entry.clone()) {
        Ok(credential) => credential,
        Err(err) => return Ok(Some(malformed(entry, err))),
    };
    let provider_key = format!("{}_{}", credential.provider, key);

    let invalid = match resolver.check(&credential.issuer.id, &provider_key, trusted, now).await? {
        TrustDecision::Authorized { .. } => return Ok(None),
        TrustDecision::NotAllowed { key, allowed } => InvalidCredential::with_message(
            entry.clone(),
            ValidationCode::ProviderNotAllowed,
            format!(
                "Tried to validate attribute {} but provider was not allowed to issue. Allowed attributes: {}",
                key,
                allowed.join(", ")
            ),
        ),
        TrustDecision::Expired => InvalidCredential::new(entry.clone(), ValidationCode::TrustClaimExpired),
        TrustDecision::NoClaims => InvalidCredential::with_message(
            entry.clone(),
            ValidationCode::NoTrustClaims,
            format!("No claims found to check. Checked dids {}", describe_identities(trusted)),
        ),
    };
    Ok(Some(invalid))
}

/// The group's holder proof, if its signature covers the group.
fn verified_holder_proof<'g>(
    provider: &str,
    group: &'g CredentialKeyObject,
) -> Result<Option<&'g Proof>, serde_json::Error> {
    let Some(proof) = group.proof.as_ref() else {
        return Ok(None);
    };
    let Some(signature) = proof.signature.as_deref() else {
        return Ok(None);
    };
    let message = CredentialObject::group_signing_text(provider, group)?;
    Ok(verify_message(&message, &proof.holder, signature).then_some(proof))
}

/// Checks the issuer proof over the credential as presented, minus the
/// signature itself.
fn issuer_signature_matches(entry: &Value, proof: &Proof) -> bool {
    let Some(signature) = proof.signature.as_deref() else {
        return false;
    };
    let mut unsigned = entry.clone();
    if let Some(unsigned_proof) = unsigned.get_mut("proof").and_then(Value::as_object_mut) {
        unsigned_proof.remove("signature");
    }
    verify_canonical(&unsigned, &proof.holder, signature)
}

fn malformed(entry: &Value, reason: impl std::fmt::Display) -> InvalidCredential {
    let code = ValidationCode::MalformedCredential;
    InvalidCredential::with_message(entry.clone(), code, format!("{}: {}", code.message(), reason))
}

/// Running count of checked and valid credentials.
#[derive(Default)]
struct Tally {
    checked: usize,
    valid: usize,
    invalid: Vec<InvalidCredential>,
}

impl Tally {
    fn pass(&mut self) {
        self.checked += 1;
        self.valid += 1;
    }

    fn fail(&mut self, invalid: InvalidCredential) {
        self.checked += 1;
        self.invalid.push(invalid);
    }

    /// Marks every credential of a group invalid; an empty group counts once.
    fn reject_group(&mut self, group: &CredentialKeyObject, code: ValidationCode) {
        if group.credentials.is_empty() {
            let presented = serde_json::to_value(group).unwrap_or(Value::Null);
            self.fail(InvalidCredential::new(presented, code));
            return;
        }
        for entry in group.credentials.values() {
            self.fail(InvalidCredential::new(entry.clone(), code));
        }
    }

    /// Valid only if at least one credential was checked and all passed.
    fn into_verdict(self, bundle: CredentialObject) -> ValidatedCredentials {
        if self.checked == 0 {
            let code = ValidationCode::Invalid;
            return ValidatedCredentials::invalid(code, "No credentials to check", Vec::new());
        }
        if self.valid == self.checked {
            return ValidatedCredentials::valid(bundle);
        }
        ValidatedCredentials::from_failures(self.invalid)
    }
}

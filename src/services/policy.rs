// src/services/policy.rs
//! Relying-party policy check.
//!
//! Runs before any cryptographic work: a bundle that does not even contain
//! what the relying party asked for is rejected as-is.

use crate::models::credential_object::{CredentialObject, ADDITIONAL_INFO_PROVIDER};
use crate::models::requested::{
    RequestedCredentialKey, RequestedCredentials, RequestedCredentialsCheckResult, RequestedKey,
};
use std::collections::BTreeSet;

/// Checks `bundle` against the requirements in `requested`.
///
/// Required items whose key is part of the `minimumRequired` quorum are left
/// to the quorum. On failure the bundle is returned unchanged in the result.
pub fn check_requested_credentials(
    bundle: &CredentialObject,
    requested: &RequestedCredentials,
) -> RequestedCredentialsCheckResult {
    let quorum_keys: BTreeSet<&str> = requested
        .minimum_required
        .as_ref()
        .map(|minimum| minimum.data.iter().map(String::as_str).collect())
        .unwrap_or_default();

    let mut missing_keys = Vec::new();
    for item in requested.credentials.iter().filter(|item| item.required) {
        if item.key_name().is_some_and(|key| quorum_keys.contains(key)) {
            continue;
        }
        if item.provider.is(ADDITIONAL_INFO_PROVIDER) {
            missing_keys.extend(unanswered_questions(bundle, item));
        } else if !is_present(bundle, item) {
            missing_keys.push(item.clone());
        }
    }

    let mut missing_message = None;
    if let Some(minimum) = &requested.minimum_required {
        let provided = quorum_keys
            .iter()
            .filter(|key| bundle.contains_key_anywhere(key))
            .count();
        if provided < minimum.amount {
            missing_message = Some(format!(
                "At least {} of [{}] required, {} provided",
                minimum.amount,
                minimum.data.join(", "),
                provided
            ));
        }
    }

    let success = missing_keys.is_empty() && missing_message.is_none();
    if !success {
        log::debug!(
            "requested credentials not satisfied: {} missing key(s){}",
            missing_keys.len(),
            missing_message.as_deref().map(|m| format!(", {}", m)).unwrap_or_default()
        );
    }
    RequestedCredentialsCheckResult {
        success,
        missing_keys,
        missing_message,
        credentials: (!success).then(|| bundle.clone()),
    }
}

fn is_present(bundle: &CredentialObject, item: &RequestedCredentialKey) -> bool {
    match item.key_name() {
        Some(key) => item
            .provider
            .names()
            .into_iter()
            .any(|provider| bundle.contains_key(provider, key)),
        None => false,
    }
}

/// The holder's answers live in the bundle's `ADDITIONAL_INFO` group as
/// request items with their `answer`s filled in.
fn unanswered_questions(bundle: &CredentialObject, item: &RequestedCredentialKey) -> Vec<RequestedCredentialKey> {
    let Some(group) = bundle.credentials.get(ADDITIONAL_INFO_PROVIDER) else {
        return vec![item.clone()];
    };

    let answered: Vec<RequestedCredentialKey> = match &item.key {
        RequestedKey::Name(key) => group
            .credentials
            .get(key)
            .and_then(|entry| serde_json::from_value(entry.clone()).ok())
            .into_iter()
            .collect(),
        RequestedKey::Questions(_) => group
            .credentials
            .values()
            .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
            .collect(),
    };
    if answered.is_empty() {
        return vec![item.clone()];
    }

    answered
        .into_iter()
        .filter(|entry| entry.required && entry.has_unanswered_questions())
        .collect()
}

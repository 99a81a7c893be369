// src/services/trust_chain.rs
//! Third-party endorsement of issuers.
//!
//! A trusted party endorses an issuer by holding a claim on its own identity
//! contract whose claim type is the issuer's contract address. The claim lists
//! the `"<provider>_<credentialKey>"` strings the issuer may produce and when
//! that endorsement expires.

use crate::contracts::identity_registry::{issuer_claim_type, IdentityRegistry};
use crate::error::RegistryError;
use crate::models::claim::TrustClaim;
use crate::models::did::Did;
use crate::utils::crypto::{checksum_address, parse_address};
use chrono::{DateTime, Utc};
use ethers::types::Address;
use std::collections::HashMap;

/// Keeps the entries of `trusted` that are addresses, logging the rest.
pub fn filter_trusted_identities<S: AsRef<str>>(trusted: &[S]) -> Vec<Address> {
    trusted
        .iter()
        .filter_map(|entry| {
            let entry = entry.as_ref();
            let address = parse_address(entry);
            if address.is_none() {
                log::warn!("Trusted party did {} is not a valid address and is ignored", entry);
            }
            address
        })
        .collect()
}

/// Outcome of checking one credential against the trusted parties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustDecision {
    /// An unexpired claim of some trusted party lists the key.
    Authorized { trusted: Address },
    /// Unexpired claims exist, but none lists the key.
    NotAllowed { key: String, allowed: Vec<String> },
    /// Every claim found has expired.
    Expired,
    /// No trusted party holds a claim about the issuer.
    NoClaims,
}

/// Per-call trust claim resolver.
///
/// Claims are cached by `(issuer contract, trusted identity)`, including
/// the absence of a claim. Registry failures are not cached.
pub struct TrustChainResolver<'a, R: IdentityRegistry + ?Sized> {
    registry: &'a R,
    cache: HashMap<(Address, Address), Option<TrustClaim>>,
}

impl<'a, R: IdentityRegistry + ?Sized> TrustChainResolver<'a, R> {
    pub fn new(registry: &'a R) -> Self {
        TrustChainResolver {
            registry,
            cache: HashMap::new(),
        }
    }

    /// Latest trust claim `trusted` holds about `issuer`.
    pub async fn claim(&mut self, issuer: Address, trusted: Address) -> Result<Option<TrustClaim>, RegistryError> {
        if let Some(claim) = self.cache.get(&(issuer, trusted)) {
            return Ok(claim.clone());
        }

        let claim = match self.registry.latest_claim(trusted, issuer_claim_type(issuer)).await? {
            Some(raw) => raw.parse_data::<TrustClaim>()?,
            None => None,
        };
        self.cache.insert((issuer, trusted), claim.clone());
        Ok(claim)
    }

    /// Checks whether any of `trusted` lets the issuer named by `issuer_did`
    /// produce `provider_key`.
    ///
    /// Every trusted party is consulted until one authorizes the key. When
    /// none does, a rejecting unexpired claim outranks an expired one, which
    /// outranks having no claim at all.
    pub async fn check(
        &mut self,
        issuer_did: &str,
        provider_key: &str,
        trusted: &[Address],
        now: DateTime<Utc>,
    ) -> Result<TrustDecision, RegistryError> {
        let issuer = match issuer_did.parse::<Did>().map(|did| did.contract_address()) {
            Ok(Some(issuer)) => issuer,
            _ => {
                log::debug!("issuer `{}` has no identity contract to look up", issuer_did);
                return Ok(TrustDecision::NoClaims);
            }
        };

        let mut rejected: Option<Vec<String>> = None;
        let mut expired = false;
        for trusted_identity in trusted {
            let Some(claim) = self.claim(issuer, *trusted_identity).await? else {
                continue;
            };
            if claim.is_expired_at(now) {
                expired = true;
                continue;
            }
            if claim.allows(provider_key) {
                return Ok(TrustDecision::Authorized {
                    trusted: *trusted_identity,
                });
            }
            rejected.get_or_insert(claim.keys);
        }

        Ok(match rejected {
            Some(allowed) => TrustDecision::NotAllowed {
                key: provider_key.to_string(),
                allowed,
            },
            None if expired => TrustDecision::Expired,
            None => TrustDecision::NoClaims,
        })
    }
}

/// Human-readable list of trusted identities for verdict messages.
pub fn describe_identities(trusted: &[Address]) -> String {
    trusted
        .iter()
        .map(checksum_address)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::memory::InMemoryRegistry;
    use crate::models::credential::DateValue;
    use chrono::TimeZone;

    const ISSUER: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn issuer_did() -> String {
        format!("did:didux:{}", ISSUER)
    }

    fn issuer() -> Address {
        ISSUER.parse().unwrap()
    }

    fn claim(expires: &str, keys: &[&str]) -> TrustClaim {
        TrustClaim {
            expiration_date: DateValue::Text(expires.into()),
            keys: keys.iter().map(|key| key.to_string()).collect(),
        }
    }

    #[test]
    fn test_filter_drops_non_addresses() {
        let trusted = filter_trusted_identities(&[
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "did:didux:0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "",
        ]);
        assert_eq!(trusted.len(), 1);
    }

    #[tokio::test]
    async fn test_first_authorizing_party_wins() {
        let rejecting = Address::repeat_byte(1);
        let authorizing = Address::repeat_byte(2);
        let registry = InMemoryRegistry::new()
            .with_trust_claim(rejecting, issuer(), &claim("2030-01-01", &["GOV_name"]))
            .with_trust_claim(authorizing, issuer(), &claim("2030-01-01", &["GOV_age_over_18"]));

        let mut resolver = TrustChainResolver::new(&registry);
        let decision = resolver
            .check(&issuer_did(), "GOV_age_over_18", &[rejecting, authorizing], now())
            .await
            .unwrap();
        assert_eq!(decision, TrustDecision::Authorized { trusted: authorizing });
    }

    #[tokio::test]
    async fn test_rejection_lists_allowed_keys() {
        let trusted = Address::repeat_byte(1);
        let registry = InMemoryRegistry::new()
            .with_trust_claim(trusted, issuer(), &claim("2030-01-01", &["GOV_name", "GOV_address"]));

        let mut resolver = TrustChainResolver::new(&registry);
        let decision = resolver
            .check(&issuer_did(), "GOV_age_over_18", &[trusted], now())
            .await
            .unwrap();
        assert_eq!(
            decision,
            TrustDecision::NotAllowed {
                key: "GOV_age_over_18".into(),
                allowed: vec!["GOV_name".into(), "GOV_address".into()],
            }
        );
    }

    #[tokio::test]
    async fn test_expired_and_missing_claims() {
        let expired = Address::repeat_byte(1);
        let silent = Address::repeat_byte(2);
        let registry = InMemoryRegistry::new()
            .with_trust_claim(expired, issuer(), &claim("2020-01-01", &["GOV_age_over_18"]));

        let mut resolver = TrustChainResolver::new(&registry);
        assert_eq!(
            resolver.check(&issuer_did(), "GOV_age_over_18", &[silent, expired], now()).await.unwrap(),
            TrustDecision::Expired
        );
        assert_eq!(
            resolver.check(&issuer_did(), "GOV_age_over_18", &[silent], now()).await.unwrap(),
            TrustDecision::NoClaims
        );
        assert_eq!(
            resolver.check("not-a-did", "GOV_age_over_18", &[expired], now()).await.unwrap(),
            TrustDecision::NoClaims
        );
    }

    #[tokio::test]
    async fn test_claims_are_cached_per_issuer_and_party() {
        let trusted = Address::repeat_byte(1);
        let registry = InMemoryRegistry::new()
            .with_trust_claim(trusted, issuer(), &claim("2030-01-01", &["GOV_age_over_18", "GOV_name"]));

        let mut resolver = TrustChainResolver::new(&registry);
        for key in ["GOV_age_over_18", "GOV_name", "GOV_age_over_18"] {
            resolver.check(&issuer_did(), key, &[trusted], now()).await.unwrap();
        }
        // getClaimIdsByType + getClaim, once
        assert_eq!(registry.call_count(), 2);
    }

    #[tokio::test]
    async fn test_malformed_claim_data_is_a_registry_error() {
        let trusted = Address::repeat_byte(1);
        let registry = InMemoryRegistry::new().with_claim(
            trusted,
            issuer_claim_type(issuer()),
            trusted,
            b"not json".to_vec(),
        );

        let mut resolver = TrustChainResolver::new(&registry);
        assert!(matches!(
            resolver.check(&issuer_did(), "GOV_age_over_18", &[trusted], now()).await,
            Err(RegistryError::MalformedClaim(_))
        ));
    }
}

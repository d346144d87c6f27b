// token.rs: Capability token claims and the signed wire encoding.
//
// A token is issued per captured plan. It lists exactly which calls the
// holder may make (action + bound parameters); anything else is denied.
// Tokens are time-bounded to limit the blast radius of a leaked token.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use ring::hmac;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use fg_actions::PlanStep;

use crate::error::CapabilityError;
use crate::key::SigningKey;

/// Value of the `issuer` claim on every token this crate mints.
pub const TOKEN_ISSUER: &str = "fleetgate";

/// The signed claims of a capability token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityToken {
    /// Random nonce; the replay-protection key.
    pub id: Uuid,
    pub issuer: String,
    /// Identity the token was minted for.
    pub subject: String,
    pub issued_at: DateTime<Utc>,
    /// Hard cutoff. Valid while `now <= expires_at`.
    pub expires_at: DateTime<Utc>,
    /// Verbatim copy of the captured plan's steps.
    pub bound_actions: Vec<PlanStep>,
}

impl CapabilityToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// SHA-256 over the bound actions, for correlating log lines without
    /// writing parameter values.
    pub fn plan_digest(&self) -> String {
        let canonical = serde_json::to_vec(&self.bound_actions).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        format!("{:x}", hasher.finalize())
    }

    /// Index of the first bound action that `action` + `params` satisfies.
    pub fn find_bound(&self, action: &str, params: &fg_actions::Params) -> Option<usize> {
        self.bound_actions
            .iter()
            .position(|step| step.is_satisfied_by(action, params))
    }

    /// Encode and sign.
    pub(crate) fn sign(&self, key: &hmac::Key) -> Result<SignedToken, CapabilityError> {
        let claims = URL_SAFE_NO_PAD.encode(serde_json::to_vec(self)?);
        let tag = hmac::sign(key, claims.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(tag.as_ref());
        Ok(SignedToken(format!("{}.{}", claims, signature)))
    }

    /// Check the signature, then decode the claims.
    ///
    /// Any failure, including a malformed string, yields `None`: callers
    /// report all of them as a bad signature.
    pub(crate) fn verify(token: &str, key: &hmac::Key) -> Option<Self> {
        let (claims, signature) = token.split_once('.')?;
        let tag = URL_SAFE_NO_PAD.decode(signature).ok()?;
        hmac::verify(key, claims.as_bytes(), &tag).ok()?;
        let json = URL_SAFE_NO_PAD.decode(claims).ok()?;
        serde_json::from_slice(&json).ok()
    }
}

/// The opaque serialized form handed to the planner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignedToken(String);

impl SignedToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for SignedToken {
    fn from(s: String) -> Self {
        SignedToken(s)
    }
}

impl AsRef<str> for SignedToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decode the claims without checking the signature.
///
/// For inspection tooling only. Nothing on the authorization path calls this.
pub fn decode_unverified(token: &str) -> Result<CapabilityToken, CapabilityError> {
    let (claims, _) = token
        .split_once('.')
        .ok_or_else(|| CapabilityError::Malformed("expected '<claims>.<signature>'".into()))?;
    let json = URL_SAFE_NO_PAD
        .decode(claims)
        .map_err(|e| CapabilityError::Malformed(format!("claims are not base64url: {}", e)))?;
    Ok(serde_json::from_slice(&json)?)
}

/// Verify with an owned key; convenience for tests and tooling.
pub fn verify_with(token: &str, key: &SigningKey) -> Option<CapabilityToken> {
    CapabilityToken::verify(token, &key.hmac_key())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use fg_actions::params;
    use serde_json::json;

    fn sample() -> CapabilityToken {
        let now = Utc::now();
        CapabilityToken {
            id: Uuid::new_v4(),
            issuer: TOKEN_ISSUER.to_string(),
            subject: "bob".to_string(),
            issued_at: now,
            expires_at: now + Duration::seconds(600),
            bound_actions: vec![PlanStep::new(
                "infra.restart",
                params(json!({"service_id": "auth"})),
            )],
        }
    }

    #[test]
    fn signed_token_verifies_under_same_key() {
        let key = SigningKey::generate();
        let token = sample();
        let signed = token.sign(&key.hmac_key()).unwrap();
        assert_eq!(verify_with(signed.as_str(), &key), Some(token));
    }

    #[test]
    fn other_key_fails_verification() {
        let signed = sample().sign(&SigningKey::generate().hmac_key()).unwrap();
        assert!(verify_with(signed.as_str(), &SigningKey::generate()).is_none());
    }

    #[test]
    fn edited_claims_fail_verification() {
        let key = SigningKey::generate();
        let signed = sample().sign(&key.hmac_key()).unwrap();
        let (_, signature) = signed.as_str().split_once('.').unwrap();

        let mut forged = sample();
        forged.bound_actions[0].params = params(json!({"service_id": "billing"}));
        let forged_claims = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let spliced = format!("{}.{}", forged_claims, signature);

        assert!(verify_with(&spliced, &key).is_none());
    }

    #[test]
    fn strings_without_separator_fail() {
        let key = SigningKey::generate();
        assert!(verify_with("no-dot-here", &key).is_none());
        assert!(decode_unverified("no-dot-here").is_err());
    }

    #[test]
    fn decode_unverified_ignores_signature() {
        let token = sample();
        let signed = token.sign(&SigningKey::generate().hmac_key()).unwrap();
        let (claims, _) = signed.as_str().split_once('.').unwrap();
        let decoded = decode_unverified(&format!("{}.AAAA", claims)).unwrap();
        assert_eq!(decoded.id, token.id);
    }

    #[test]
    fn plan_digest_tracks_bound_actions() {
        let a = sample();
        let mut b = a.clone();
        b.id = Uuid::new_v4();
        assert_eq!(a.plan_digest(), b.plan_digest());
        assert_eq!(a.plan_digest().len(), 64);

        b.bound_actions[0].params = params(json!({"service_id": "billing"}));
        assert_ne!(a.plan_digest(), b.plan_digest());
    }

    #[test]
    fn expiry_is_inclusive_of_deadline() {
        let token = sample();
        assert!(!token.is_expired_at(token.expires_at));
        assert!(token.is_expired_at(token.expires_at + Duration::milliseconds(1)));
    }
}

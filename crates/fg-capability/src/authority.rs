// authority.rs: Minting and validating capability tokens.
//
// validate() runs its checks in a fixed order:
//
// 1. signature (covers malformed strings too)
// 2. expiry
// 3. replay: the id is marked used here, before the remaining checks, so a
//    rejected presentation still burns the token
// 4. subject
// 5. bound-action match
//
// The used-token set is the only mutable state. Steps 3 to 5 run inside one
// critical section so two concurrent presentations of the same token cannot
// both pass.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use ring::hmac;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use fg_actions::{Clock, Params, Plan, SystemClock};

use crate::error::CapabilityError;
use crate::key::SigningKey;
use crate::token::{CapabilityToken, SignedToken, TOKEN_ISSUER};

/// What a successful presentation consumes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayScope {
    /// The first presentation burns the whole token.
    #[default]
    Token,
    /// Each bound action may be presented once. Failed presentations still
    /// burn the whole token.
    BoundAction,
}

impl fmt::Display for ReplayScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayScope::Token => write!(f, "token"),
            ReplayScope::BoundAction => write!(f, "bound_action"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Lifetime of a minted token.
    pub ttl_secs: u64,
    pub replay_scope: ReplayScope,
}

/// Longest token lifetime a config may ask for (30 days).
pub const MAX_TTL_SECS: u64 = 30 * 24 * 3600;

impl TokenConfig {
    /// Reject lifetimes that are zero or beyond [`MAX_TTL_SECS`].
    pub fn validate(&self) -> Result<(), CapabilityError> {
        if self.ttl_secs == 0 {
            return Err(CapabilityError::InvalidConfig(
                "ttl_secs must be positive".to_string(),
            ));
        }
        if self.ttl_secs > MAX_TTL_SECS {
            return Err(CapabilityError::InvalidConfig(format!(
                "ttl_secs {} exceeds the maximum of {}",
                self.ttl_secs, MAX_TTL_SECS
            )));
        }
        Ok(())
    }

    fn ttl(&self) -> Duration {
        Duration::seconds(self.ttl_secs.min(MAX_TTL_SECS) as i64)
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 600,
            replay_scope: ReplayScope::Token,
        }
    }
}

/// Why a token presentation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("expired")]
    Expired,
    #[error("replay")]
    Replay,
    #[error("subject mismatch")]
    SubjectMismatch,
    #[error("action not authorized by token")]
    ActionNotAuthorized,
}

impl Rejection {
    /// Rejections that suggest an attack rather than a stale client.
    pub fn is_security_event(&self) -> bool {
        matches!(self, Rejection::Replay | Rejection::SubjectMismatch)
    }
}

/// Result of presenting a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The call matches bound action number `step` of token `token_id`.
    Valid { token_id: Uuid, step: usize },
    Rejected(Rejection),
}

impl ValidationOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ValidationOutcome::Valid { .. })
    }

    /// `"ok"` or the rejection message.
    pub fn reason(&self) -> String {
        match self {
            ValidationOutcome::Valid { .. } => "ok".to_string(),
            ValidationOutcome::Rejected(r) => r.to_string(),
        }
    }

    pub fn into_result(self) -> Result<(Uuid, usize), Rejection> {
        match self {
            ValidationOutcome::Valid { token_id, step } => Ok((token_id, step)),
            ValidationOutcome::Rejected(r) => Err(r),
        }
    }
}

#[derive(Debug)]
enum Consumed {
    Whole,
    Steps(BTreeSet<usize>),
}

#[derive(Debug)]
struct UsedEntry {
    expires_at: DateTime<Utc>,
    consumed: Consumed,
}

/// Issues and checks capability tokens.
pub struct TokenAuthority {
    key: hmac::Key,
    config: TokenConfig,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    used: Mutex<HashMap<Uuid, UsedEntry>>,
}

impl TokenAuthority {
    /// Fails only when `config` is out of range.
    pub fn new(
        key: SigningKey,
        config: TokenConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CapabilityError> {
        config.validate()?;
        Ok(Self::build(key, config, clock))
    }

    /// Default configuration on the system clock.
    pub fn with_key(key: SigningKey) -> Self {
        Self::build(key, TokenConfig::default(), Arc::new(SystemClock))
    }

    fn build(key: SigningKey, config: TokenConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            key: key.hmac_key(),
            ttl: config.ttl(),
            config,
            clock,
            used: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Mint a token binding `subject` to exactly the steps of `plan`.
    pub fn mint(&self, subject: &str, plan: &Plan) -> Result<SignedToken, CapabilityError> {
        let now = self.clock.now();
        let token = CapabilityToken {
            id: Uuid::new_v4(),
            issuer: TOKEN_ISSUER.to_string(),
            subject: subject.to_string(),
            issued_at: now,
            expires_at: now + self.ttl,
            bound_actions: plan.steps.clone(),
        };
        let signed = token.sign(&self.key)?;

        tracing::info!(
            token_id = %token.id,
            subject,
            steps = token.bound_actions.len(),
            plan_digest = %token.plan_digest(),
            expires_at = %token.expires_at,
            "minted capability token"
        );
        Ok(signed)
    }

    /// Check one presentation of `token` for `action` with `params`.
    ///
    /// `subject`, when given, must equal the token's subject.
    pub fn validate(
        &self,
        token: &str,
        action: &str,
        params: &Params,
        subject: Option<&str>,
    ) -> ValidationOutcome {
        let Some(claims) = CapabilityToken::verify(token, &self.key) else {
            tracing::info!(action, "token rejected: invalid signature");
            return ValidationOutcome::Rejected(Rejection::InvalidSignature);
        };

        let now = self.clock.now();
        if claims.is_expired_at(now) {
            tracing::info!(token_id = %claims.id, action, "token rejected: expired");
            return ValidationOutcome::Rejected(Rejection::Expired);
        }

        let outcome = match self.used.lock() {
            Ok(mut used) => self.check_and_consume(&mut used, &claims, action, params, subject),
            Err(_) => {
                tracing::error!(token_id = %claims.id, "used-token set poisoned; refusing token");
                ValidationOutcome::Rejected(Rejection::Replay)
            }
        };

        match &outcome {
            ValidationOutcome::Valid { step, .. } => tracing::debug!(
                token_id = %claims.id,
                action,
                step,
                "token accepted"
            ),
            ValidationOutcome::Rejected(r) if r.is_security_event() => tracing::warn!(
                target: "fleetgate::security",
                token_id = %claims.id,
                token_subject = %claims.subject,
                presented_by = subject.unwrap_or("-"),
                action,
                rejection = %r,
                "capability token rejected"
            ),
            ValidationOutcome::Rejected(r) => tracing::info!(
                token_id = %claims.id,
                action,
                rejection = %r,
                "token rejected"
            ),
        }
        outcome
    }

    fn check_and_consume(
        &self,
        used: &mut HashMap<Uuid, UsedEntry>,
        claims: &CapabilityToken,
        action: &str,
        params: &Params,
        subject: Option<&str>,
    ) -> ValidationOutcome {
        let burn = |used: &mut HashMap<Uuid, UsedEntry>| {
            used.insert(
                claims.id,
                UsedEntry {
                    expires_at: claims.expires_at,
                    consumed: Consumed::Whole,
                },
            );
        };

        let already: BTreeSet<usize> = match used.get(&claims.id).map(|e| &e.consumed) {
            Some(Consumed::Whole) => return ValidationOutcome::Rejected(Rejection::Replay),
            Some(Consumed::Steps(steps)) => steps.clone(),
            None => BTreeSet::new(),
        };

        if self.config.replay_scope == ReplayScope::Token {
            burn(used);
        }

        if subject.is_some_and(|s| s != claims.subject) {
            burn(used);
            return ValidationOutcome::Rejected(Rejection::SubjectMismatch);
        }

        match self.config.replay_scope {
            ReplayScope::Token => match claims.find_bound(action, params) {
                Some(step) => ValidationOutcome::Valid {
                    token_id: claims.id,
                    step,
                },
                None => ValidationOutcome::Rejected(Rejection::ActionNotAuthorized),
            },
            ReplayScope::BoundAction => {
                let mut matched_consumed = false;
                let free = claims
                    .bound_actions
                    .iter()
                    .enumerate()
                    .filter(|(_, step)| step.is_satisfied_by(action, params))
                    .map(|(i, _)| i)
                    .find(|i| {
                        let taken = already.contains(i);
                        matched_consumed |= taken;
                        !taken
                    });

                match free {
                    Some(step) => {
                        let mut steps = already;
                        steps.insert(step);
                        used.insert(
                            claims.id,
                            UsedEntry {
                                expires_at: claims.expires_at,
                                consumed: Consumed::Steps(steps),
                            },
                        );
                        ValidationOutcome::Valid {
                            token_id: claims.id,
                            step,
                        }
                    }
                    None if matched_consumed => ValidationOutcome::Rejected(Rejection::Replay),
                    None => {
                        burn(used);
                        ValidationOutcome::Rejected(Rejection::ActionNotAuthorized)
                    }
                }
            }
        }
    }

    /// Number of token ids currently remembered as presented.
    pub fn used_count(&self) -> usize {
        self.used.lock().map(|u| u.len()).unwrap_or(0)
    }

    /// Forget ids of tokens that have expired. Such tokens fail the expiry
    /// check before reaching the replay check, so this never re-enables one.
    ///
    /// Returns how many ids were dropped.
    pub fn prune_expired(&self) -> usize {
        let now = self.clock.now();
        match self.used.lock() {
            Ok(mut used) => {
                let before = used.len();
                used.retain(|_, entry| entry.expires_at >= now);
                let pruned = before - used.len();
                if pruned > 0 {
                    tracing::debug!(pruned, "pruned expired token ids");
                }
                pruned
            }
            Err(_) => 0,
        }
    }
}

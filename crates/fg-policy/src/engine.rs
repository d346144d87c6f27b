// engine.rs: Policy evaluation engine.
//
// Every call the gateway dispatches passes through `allow()`, which checks,
// in order:
//
// 1. Does the request's identity field name someone other than the caller? → Deny
// 2. Does the caller hold an admin role? → Allow
// 3. First rule whose pattern matches the action decides (open, restricted,
//    rate-limited).
// 4. No rule matched, or the rule excludes the caller's roles → Deny
//
// `allow()` never mutates the history. `consume()` commits quota once the
// action has actually succeeded.

use std::sync::Arc;

use chrono::Duration;
use glob::Pattern;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use fg_actions::{Clock, Params, SystemClock};

use crate::actor::Actor;
use crate::config::{ActionRule, PolicyConfig};
use crate::error::PolicyError;
use crate::history::ActorHistory;

/// The result of a policy evaluation. Both arms carry a human-readable reason.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PolicyDecision {
    Allow { reason: String },
    Deny { reason: String },
}

impl PolicyDecision {
    pub fn allow(reason: impl Into<String>) -> Self {
        PolicyDecision::Allow {
            reason: reason.into(),
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        PolicyDecision::Deny {
            reason: reason.into(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, PolicyDecision::Allow { .. })
    }

    pub fn reason(&self) -> &str {
        match self {
            PolicyDecision::Allow { reason } | PolicyDecision::Deny { reason } => reason,
        }
    }
}

/// A step in the evaluation chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationStep {
    /// Which check was performed (e.g., "identity_binding", "rule_match").
    pub check: String,
    /// What the check found (e.g., "passed", "failed: no rule matched").
    pub outcome: String,
    /// Whether this step decided the request.
    pub terminal: bool,
}

/// Full evaluation trace returned alongside a [`PolicyDecision`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationTrace {
    pub decision: PolicyDecision,
    pub steps: Vec<EvaluationStep>,
    /// Label of the rule that matched the action, if any.
    pub matched_rule: Option<String>,
}

/// Accumulates steps while the engine walks the checks.
struct Tracer {
    steps: Vec<EvaluationStep>,
    matched_rule: Option<String>,
}

impl Tracer {
    fn new() -> Self {
        Self {
            steps: Vec::new(),
            matched_rule: None,
        }
    }

    fn pass(&mut self, check: &str, outcome: impl Into<String>) {
        self.steps.push(EvaluationStep {
            check: check.to_string(),
            outcome: outcome.into(),
            terminal: false,
        });
    }

    fn decide(mut self, check: &str, decision: PolicyDecision) -> EvaluationTrace {
        let outcome = match &decision {
            PolicyDecision::Allow { reason } => format!("allowed: {}", reason),
            PolicyDecision::Deny { reason } => format!("denied: {}", reason),
        };
        self.steps.push(EvaluationStep {
            check: check.to_string(),
            outcome,
            terminal: true,
        });
        EvaluationTrace {
            decision,
            steps: self.steps,
            matched_rule: self.matched_rule,
        }
    }
}

struct CompiledRule {
    pattern: Pattern,
    rule: ActionRule,
}

/// Evaluates (actor, action, params) requests against the rule table and
/// owns the rate-limit history those rules consult.
pub struct PolicyEngine {
    config: PolicyConfig,
    rules: Vec<CompiledRule>,
    history: Arc<ActorHistory>,
    clock: Arc<dyn Clock>,
}

impl PolicyEngine {
    /// Build an engine on the system clock with a fresh history.
    pub fn new(config: PolicyConfig) -> Result<Self, PolicyError> {
        Self::with_parts(config, Arc::new(SystemClock), Arc::new(ActorHistory::new()))
    }

    /// Build an engine with an injected clock and history store.
    pub fn with_parts(
        config: PolicyConfig,
        clock: Arc<dyn Clock>,
        history: Arc<ActorHistory>,
    ) -> Result<Self, PolicyError> {
        let rules = config
            .rules
            .iter()
            .map(|rule| {
                Ok(CompiledRule {
                    pattern: rule.compile()?,
                    rule: rule.clone(),
                })
            })
            .collect::<Result<Vec<_>, PolicyError>>()?;

        tracing::debug!(rules = rules.len(), "policy engine ready");
        Ok(Self {
            config,
            rules,
            history,
            clock,
        })
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn history(&self) -> &Arc<ActorHistory> {
        &self.history
    }

    /// Decide whether `actor` may run `action` with `params`.
    ///
    /// Read-only: calling this any number of times leaves the history as it was.
    pub fn allow(&self, actor: &Actor, action: &str, params: &Params) -> PolicyDecision {
        self.allow_with_trace(actor, action, params).decision
    }

    /// Same as [`allow`](Self::allow), recording every check performed.
    pub fn allow_with_trace(&self, actor: &Actor, action: &str, params: &Params) -> EvaluationTrace {
        let mut tracer = Tracer::new();

        // Step 1: identity binding. Runs before the admin bypass.
        if let Some(claimed) = bound_identity(params, &self.config.identity_param) {
            if claimed != actor.identity {
                tracing::warn!(
                    target: "fleetgate::security",
                    caller = %actor.identity,
                    claimed = %claimed,
                    action,
                    "identity mismatch"
                );
                return tracer.decide("identity_binding", PolicyDecision::deny("identity mismatch"));
            }
            tracer.pass("identity_binding", format!("passed: bound to '{}'", claimed));
        } else {
            tracer.pass("identity_binding", "skipped: no identity field");
        }

        // Step 2: admin bypass.
        if let Some(role) = actor.first_role_in(&self.config.admin_roles) {
            tracing::debug!(actor = %actor.identity, role, action, "admin bypass");
            return tracer.decide("admin_bypass", PolicyDecision::allow("admin access"));
        }
        tracer.pass("admin_bypass", "not an admin");

        // Step 3: first matching rule.
        let Some(compiled) = self.rules.iter().find(|r| r.pattern.matches(action)) else {
            return tracer.decide("rule_match", self.default_deny(actor, action));
        };
        tracer.matched_rule = Some(compiled.rule.describe());
        tracer.pass("rule_match", format!("matched '{}'", compiled.rule.pattern()));

        match &compiled.rule {
            ActionRule::Open { .. } => tracer.decide(
                "open_rule",
                PolicyDecision::allow(format!("'{}' is open to all roles", action)),
            ),

            ActionRule::Restricted { roles, .. } => match actor.first_role_in(roles) {
                Some(role) => tracer.decide(
                    "role_check",
                    PolicyDecision::allow(format!("'{}' permitted for role '{}'", action, role)),
                ),
                None => tracer.decide("role_check", self.default_deny(actor, action)),
            },

            ActionRule::RateLimited {
                roles,
                resource_param,
                limit,
                window_secs,
                ..
            } => {
                let Some(resource) = resource_key(params, resource_param) else {
                    return tracer.decide(
                        "resource_param",
                        PolicyDecision::deny(format!("missing {} parameter", resource_param)),
                    );
                };
                tracer.pass("resource_param", format!("resource '{}'", resource));

                if actor.first_role_in(roles).is_none() {
                    return tracer.decide("role_check", self.default_deny(actor, action));
                }

                let window = Duration::seconds(*window_secs as i64);
                let now = self.clock.now();
                let used = match self.history.count_within(&actor.identity, &resource, now, window) {
                    Ok(n) => n,
                    Err(e) => {
                        tracing::error!(error = %e, "denying: rate-limit history unreadable");
                        return tracer.decide("rate_limit", PolicyDecision::deny(e.to_string()));
                    }
                };

                if used >= *limit {
                    tracing::info!(
                        actor = %actor.identity,
                        action,
                        resource = %resource,
                        used,
                        limit,
                        "rate limit reached"
                    );
                    return tracer.decide(
                        "rate_limit",
                        PolicyDecision::deny(format!(
                            "rate limit reached: at most {} {} per {}s for {} '{}'",
                            limit, action, window_secs, resource_param, resource
                        )),
                    );
                }

                tracer.decide(
                    "rate_limit",
                    PolicyDecision::allow(format!(
                        "within rate limit ({}/{} used for '{}')",
                        used, limit, resource
                    )),
                )
            }
        }
    }

    /// Record one successful run against any rate limit that applies.
    ///
    /// Call only after the action succeeded. A no-op for actions or actors no
    /// rate-limited rule covers.
    pub fn consume(&self, actor: &Actor, action: &str, params: &Params) {
        let Some(compiled) = self.rules.iter().find(|r| r.pattern.matches(action)) else {
            return;
        };
        let ActionRule::RateLimited {
            roles,
            resource_param,
            window_secs,
            ..
        } = &compiled.rule
        else {
            return;
        };
        if actor.first_role_in(roles).is_none() {
            return;
        }
        let Some(resource) = resource_key(params, resource_param) else {
            return;
        };

        let window = Duration::seconds(*window_secs as i64);
        match self
            .history
            .record(&actor.identity, &resource, self.clock.now(), window)
        {
            Ok(in_window) => tracing::debug!(
                actor = %actor.identity,
                action,
                resource = %resource,
                in_window,
                "quota consumed"
            ),
            Err(e) => tracing::error!(
                actor = %actor.identity,
                action,
                error = %e,
                "failed to record quota"
            ),
        }
    }

    fn default_deny(&self, actor: &Actor, action: &str) -> PolicyDecision {
        PolicyDecision::deny(format!(
            "action '{}' denied for role(s) [{}]",
            action,
            actor.roles.join(", ")
        ))
    }
}

/// The identity a request claims to act for. Null and empty values count as
/// absent.
fn bound_identity<'a>(params: &'a Params, field: &str) -> Option<&'a str> {
    match params.get(field)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.as_str()),
        // Non-string identities can never equal a username; keep them so the
        // comparison fails.
        _ => Some(""),
    }
}

fn resource_key(params: &Params, field: &str) -> Option<String> {
    match params.get(field)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fg_actions::{params, ManualClock};
    use serde_json::json;

    fn engine_with_clock() -> (PolicyEngine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let engine = PolicyEngine::with_parts(
            PolicyConfig::default(),
            clock.clone(),
            Arc::new(ActorHistory::new()),
        )
        .unwrap();
        (engine, clock)
    }

    fn junior() -> Actor {
        Actor::new("bob", ["junior"])
    }

    #[test]
    fn junior_restart_is_limited_per_window() {
        let (engine, clock) = engine_with_clock();
        let p = params(json!({"service_id": "X"}));

        assert!(engine.allow(&junior(), "infra.restart", &p).is_allowed());
        engine.consume(&junior(), "infra.restart", &p);

        let second = engine.allow(&junior(), "infra.restart", &p);
        assert!(!second.is_allowed());
        assert!(second.reason().contains("limit"));
        assert!(second.reason().contains("X"));

        clock.advance(Duration::seconds(3600));
        assert!(engine.allow(&junior(), "infra.restart", &p).is_allowed());
    }

    #[test]
    fn limit_is_per_resource() {
        let (engine, _clock) = engine_with_clock();
        let a = params(json!({"service_id": "A"}));
        let b = params(json!({"service_id": "B"}));
        engine.consume(&junior(), "infra.restart", &a);
        assert!(!engine.allow(&junior(), "infra.restart", &a).is_allowed());
        assert!(engine.allow(&junior(), "infra.restart", &b).is_allowed());
    }

    #[test]
    fn allow_is_read_only() {
        let (engine, _clock) = engine_with_clock();
        let p = params(json!({"service_id": "X"}));
        for _ in 0..5 {
            assert!(engine.allow(&junior(), "infra.restart", &p).is_allowed());
        }
        assert_eq!(engine.history().stored("bob", "X"), 0);
    }

    #[test]
    fn restart_without_service_id_is_denied() {
        let (engine, _clock) = engine_with_clock();
        let decision = engine.allow(&junior(), "infra.restart", &Params::new());
        assert_eq!(decision, PolicyDecision::deny("missing service_id parameter"));
    }

    #[test]
    fn identity_mismatch_beats_admin_bypass() {
        let (engine, _clock) = engine_with_clock();
        let p = params(json!({"agent_id": "alice", "user_id": "u1"}));

        for roles in [vec!["junior"], vec!["admin"], vec!["superadmin", "junior"]] {
            let actor = Actor::new("bob", roles);
            let trace = engine.allow_with_trace(&actor, "user.revoke", &p);
            assert_eq!(trace.decision, PolicyDecision::deny("identity mismatch"));
            assert_eq!(trace.steps.len(), 1);
            assert_eq!(trace.steps[0].check, "identity_binding");
        }
    }

    #[test]
    fn matching_identity_passes_binding() {
        let (engine, _clock) = engine_with_clock();
        let p = params(json!({"agent_id": "bob", "user_id": "u1"}));
        assert!(engine.allow(&junior(), "user.revoke", &p).is_allowed());
    }

    #[test]
    fn non_string_identity_is_a_mismatch() {
        let (engine, _clock) = engine_with_clock();
        let p = params(json!({"agent_id": 7}));
        let admin = Actor::new("bob", ["admin"]);
        assert!(!engine.allow(&admin, "alert.create", &p).is_allowed());
    }

    #[test]
    fn admin_bypasses_rules() {
        let (engine, _clock) = engine_with_clock();
        let admin = Actor::new("root", ["admin"]);
        let p = params(json!({"db_id": "db-1", "confirm": true}));
        let decision = engine.allow(&admin, "security.rotate_keys", &p);
        assert!(decision.is_allowed());
        assert_eq!(decision.reason(), "admin access");
    }

    #[test]
    fn admin_restart_is_never_limited() {
        let (engine, _clock) = engine_with_clock();
        let admin = Actor::new("root", ["superadmin"]);
        let p = params(json!({"service_id": "X"}));
        for _ in 0..3 {
            assert!(engine.allow(&admin, "infra.restart", &p).is_allowed());
            engine.consume(&admin, "infra.restart", &p);
        }
        assert_eq!(engine.history().stored("root", "X"), 0);
    }

    #[test]
    fn open_families_allow_any_role() {
        let (engine, _clock) = engine_with_clock();
        let viewer = Actor::new("eve", ["viewer"]);
        assert!(engine.allow(&viewer, "alert.create", &Params::new()).is_allowed());
        assert!(engine.allow(&viewer, "data.backup", &Params::new()).is_allowed());
    }

    #[test]
    fn user_family_is_junior_only() {
        let (engine, _clock) = engine_with_clock();
        let viewer = Actor::new("eve", ["viewer"]);
        let decision = engine.allow(&viewer, "user.create", &Params::new());
        assert!(!decision.is_allowed());
        assert!(decision.reason().contains("viewer"));
        assert!(decision.reason().contains("user.create"));
    }

    #[test]
    fn unmatched_action_falls_to_default_deny() {
        let (engine, _clock) = engine_with_clock();
        let trace = engine.allow_with_trace(&junior(), "security.lock_account", &Params::new());
        assert!(!trace.decision.is_allowed());
        assert!(trace.matched_rule.is_none());
        assert_eq!(
            trace.decision.reason(),
            "action 'security.lock_account' denied for role(s) [junior]"
        );
    }

    #[test]
    fn non_junior_restart_is_denied() {
        let (engine, _clock) = engine_with_clock();
        let viewer = Actor::new("eve", ["viewer"]);
        let p = params(json!({"service_id": "X"}));
        assert!(!engine.allow(&viewer, "infra.restart", &p).is_allowed());
    }

    #[test]
    fn shared_history_sees_consumption_from_another_engine() {
        let clock = Arc::new(ManualClock::starting_now());
        let history = Arc::new(ActorHistory::new());
        let first =
            PolicyEngine::with_parts(PolicyConfig::default(), clock.clone(), history.clone()).unwrap();
        let second = PolicyEngine::with_parts(PolicyConfig::default(), clock, history).unwrap();

        let p = params(json!({"service_id": "X"}));
        first.consume(&junior(), "infra.restart", &p);
        assert!(!second.allow(&junior(), "infra.restart", &p).is_allowed());
    }

    #[test]
    fn concurrent_consume_loses_no_updates() {
        let (engine, _clock) = engine_with_clock();
        let engine = Arc::new(engine);
        let p = params(json!({"service_id": "X"}));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                let p = p.clone();
                std::thread::spawn(move || engine.consume(&junior(), "infra.restart", &p))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(engine.history().stored("bob", "X"), 8);
    }

    #[test]
    fn invalid_pattern_fails_construction() {
        let config = PolicyConfig {
            rules: vec![ActionRule::Open {
                pattern: "[".to_string(),
            }],
            ..PolicyConfig::default()
        };
        assert!(PolicyEngine::new(config).is_err());
    }

    fn restart_limited(window_secs: u64) -> PolicyConfig {
        PolicyConfig {
            rules: vec![ActionRule::RateLimited {
                pattern: "infra.restart".to_string(),
                roles: vec!["junior".to_string()],
                resource_param: "service_id".to_string(),
                limit: 1,
                window_secs,
            }],
            ..PolicyConfig::default()
        }
    }

    #[test]
    fn oversized_window_fails_construction() {
        assert!(matches!(
            PolicyEngine::new(restart_limited(10_000_000_000_000_000)),
            Err(PolicyError::InvalidRule { .. })
        ));
    }

    #[test]
    fn longest_window_still_evaluates() {
        let clock = Arc::new(ManualClock::starting_now());
        let engine = PolicyEngine::with_parts(
            restart_limited(crate::config::MAX_WINDOW_SECS),
            clock.clone(),
            Arc::new(ActorHistory::new()),
        )
        .unwrap();
        let p = params(json!({"service_id": "X"}));

        assert!(engine.allow(&junior(), "infra.restart", &p).is_allowed());
        engine.consume(&junior(), "infra.restart", &p);
        clock.advance(Duration::days(365));
        assert!(!engine.allow(&junior(), "infra.restart", &p).is_allowed());
    }

    #[test]
    fn decision_serializes_with_tag() {
        let json = serde_json::to_value(PolicyDecision::deny("nope")).unwrap();
        assert_eq!(json, json!({"decision": "deny", "reason": "nope"}));
    }
}

// config.rs: Declarative policy rules.
//
// Rules are matched in order; the first rule whose glob pattern matches the
// action name decides. Admin roles bypass the rule table entirely (after the
// identity binding check).

use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// Longest rate-limit window a rule may declare (366 days).
pub const MAX_WINDOW_SECS: u64 = 366 * 24 * 3600;

/// One entry in the rule table.
///
/// Serialized with an internal `kind` tag so it reads naturally in TOML:
///
/// ```toml
/// [[policy.rules]]
/// kind = "rate_limited"
/// pattern = "infra.restart"
/// roles = ["junior"]
/// resource_param = "service_id"
/// limit = 1
/// window_secs = 3600
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionRule {
    /// Anyone may run matching actions.
    Open { pattern: String },

    /// Only the listed roles may run matching actions.
    Restricted { pattern: String, roles: Vec<String> },

    /// Every request must name a resource in `resource_param`. Callers holding
    /// one of `roles` get at most `limit` successful runs per resource within
    /// a sliding window of `window_secs`; other non-admin callers are denied.
    RateLimited {
        pattern: String,
        roles: Vec<String>,
        resource_param: String,
        limit: usize,
        window_secs: u64,
    },
}

impl ActionRule {
    pub fn pattern(&self) -> &str {
        match self {
            ActionRule::Open { pattern }
            | ActionRule::Restricted { pattern, .. }
            | ActionRule::RateLimited { pattern, .. } => pattern,
        }
    }

    /// Short label used in traces and logs.
    pub fn describe(&self) -> String {
        match self {
            ActionRule::Open { pattern } => format!("open {}", pattern),
            ActionRule::Restricted { pattern, roles } => {
                format!("restricted {} to [{}]", pattern, roles.join(", "))
            }
            ActionRule::RateLimited {
                pattern,
                roles,
                limit,
                window_secs,
                ..
            } => format!(
                "rate_limited {} for [{}]: {} per {}s",
                pattern,
                roles.join(", "),
                limit,
                window_secs
            ),
        }
    }

    /// Parse the pattern and sanity-check the numbers.
    pub(crate) fn compile(&self) -> Result<Pattern, PolicyError> {
        let pattern = Pattern::new(self.pattern()).map_err(|e| PolicyError::InvalidPattern {
            pattern: self.pattern().to_string(),
            reason: e.to_string(),
        })?;

        if let ActionRule::RateLimited {
            limit,
            window_secs,
            resource_param,
            ..
        } = self
        {
            let invalid = |reason: &str| PolicyError::InvalidRule {
                pattern: self.pattern().to_string(),
                reason: reason.to_string(),
            };
            if *window_secs == 0 {
                return Err(invalid("window_secs must be positive"));
            }
            if *window_secs > MAX_WINDOW_SECS {
                let reason = format!("window_secs must be at most {}", MAX_WINDOW_SECS);
                return Err(invalid(reason.as_str()));
            }
            if *limit == 0 {
                return Err(invalid("limit must be at least 1"));
            }
            if resource_param.is_empty() {
                return Err(invalid("resource_param must not be empty"));
            }
        }

        Ok(pattern)
    }
}

/// Policy engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Request parameter that, when present, must equal the caller's identity.
    pub identity_param: String,
    /// Roles that bypass the rule table.
    pub admin_roles: Vec<String>,
    pub rules: Vec<ActionRule>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        let junior = vec!["junior".to_string()];
        Self {
            identity_param: "agent_id".to_string(),
            admin_roles: vec!["admin".to_string(), "superadmin".to_string()],
            rules: vec![
                ActionRule::RateLimited {
                    pattern: "infra.restart".to_string(),
                    roles: junior.clone(),
                    resource_param: "service_id".to_string(),
                    limit: 1,
                    window_secs: 3600,
                },
                ActionRule::Open {
                    pattern: "alert.create".to_string(),
                },
                ActionRule::Open {
                    pattern: "data.*".to_string(),
                },
                ActionRule::Restricted {
                    pattern: "user.*".to_string(),
                    roles: junior,
                },
            ],
        }
    }
}

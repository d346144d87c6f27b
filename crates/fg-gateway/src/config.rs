// config.rs: Gateway configuration.
//
// Every field has a default, so an empty file (or no file) reproduces the
// stock behavior: 10 minute tokens, 5 second executor timeout, tokens burned
// on first presentation, and the standard fleet policy.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use fg_capability::{ReplayScope, TokenConfig};
use fg_policy::PolicyConfig;

use crate::error::GatewayError;

/// Environment variable holding the base64 signing key unless overridden.
pub const DEFAULT_SIGNING_KEY_ENV: &str = "FLEETGATE_SIGNING_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub token_ttl_secs: u64,
    /// Upper bound on one executor call.
    pub executor_timeout_ms: u64,
    pub replay_scope: ReplayScope,
    /// Name of the environment variable the signing key is read from.
    pub signing_key_env: String,
    pub policy: PolicyConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: 600,
            executor_timeout_ms: 5000,
            replay_scope: ReplayScope::Token,
            signing_key_env: DEFAULT_SIGNING_KEY_ENV.to_string(),
            policy: PolicyConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load from a TOML file, or YAML when the extension is `.yaml`/`.yml`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GatewayError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| GatewayError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

        let parsed = if is_yaml {
            serde_yaml::from_str(&text).map_err(|e| e.to_string())
        } else {
            toml::from_str(&text).map_err(|e| e.to_string())
        };

        let config = parsed.map_err(|reason| GatewayError::ConfigParse {
            path: path.to_path_buf(),
            reason,
        })?;
        tracing::debug!(path = %path.display(), "loaded gateway config");
        Ok(config)
    }

    pub fn token_config(&self) -> TokenConfig {
        TokenConfig {
            ttl_secs: self.token_ttl_secs,
            replay_scope: self.replay_scope,
        }
    }

    pub fn executor_timeout(&self) -> Duration {
        Duration::from_millis(self.executor_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_compatibility_values() {
        let config = GatewayConfig::default();
        assert_eq!(config.token_ttl_secs, 600);
        assert_eq!(config.executor_timeout(), Duration::from_secs(5));
        assert_eq!(config.replay_scope, ReplayScope::Token);
        assert_eq!(config.signing_key_env, "FLEETGATE_SIGNING_KEY");
    }

    #[test]
    fn loads_partial_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
token_ttl_secs = 120
replay_scope = "bound_action"

[policy]
admin_roles = ["root"]
"#
        )
        .unwrap();

        let config = GatewayConfig::load(file.path()).unwrap();
        assert_eq!(config.token_ttl_secs, 120);
        assert_eq!(config.replay_scope, ReplayScope::BoundAction);
        assert_eq!(config.executor_timeout_ms, 5000);
        assert_eq!(config.policy.admin_roles, vec!["root"]);
        assert_eq!(config.policy.identity_param, "agent_id");
    }

    #[test]
    fn loads_yaml_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "executor_timeout_ms: 250\npolicy:\n  rules:\n    - kind: open\n      pattern: \"alert.*\"\n"
        )
        .unwrap();

        let config = GatewayConfig::load(file.path()).unwrap();
        assert_eq!(config.executor_timeout_ms, 250);
        assert_eq!(config.policy.rules.len(), 1);
        assert_eq!(config.policy.rules[0].pattern(), "alert.*");
    }

    #[test]
    fn parse_errors_name_the_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "token_ttl_secs = \"soon\"").unwrap();
        let err = GatewayConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, GatewayError::ConfigParse { .. }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = GatewayConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, GatewayError::ConfigRead { .. }));
    }
}

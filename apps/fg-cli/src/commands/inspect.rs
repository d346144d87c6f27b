// inspect.rs: `fleetgate inspect`.
//
// Prints the claims of a token. The signature is checked only when the
// configured signing key is available; the output says which.

use chrono::Utc;
use serde_json::json;

use fg_capability::{decode_unverified, verify_with, SigningKey};
use fg_gateway::GatewayConfig;

pub fn execute(config: &GatewayConfig, token: &str) -> anyhow::Result<()> {
    let claims = decode_unverified(token)?;

    let signature = match SigningKey::from_env(&config.signing_key_env) {
        Ok(key) if verify_with(token, &key).is_some() => "valid",
        Ok(_) => "invalid",
        Err(_) => "unchecked",
    };

    let report = json!({
        "signature": signature,
        "expired": claims.is_expired_at(Utc::now()),
        "plan_digest": claims.plan_digest(),
        "claims": claims,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

// mint.rs: `fleetgate mint`.

use std::path::Path;
use std::sync::Arc;

use fg_actions::SystemClock;
use fg_capability::{SigningKey, TokenAuthority};
use fg_gateway::GatewayConfig;

use super::read_plan;

pub fn execute(config: &GatewayConfig, subject: &str, plan_path: &Path) -> anyhow::Result<()> {
    let plan = read_plan(plan_path)?;
    let key = SigningKey::from_env(&config.signing_key_env)?;
    let authority = TokenAuthority::new(key, config.token_config(), Arc::new(SystemClock))?;
    let token = authority.mint(subject, &plan)?;
    println!("{}", token);
    Ok(())
}

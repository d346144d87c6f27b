// run.rs: `fleetgate run`. Capture a plan and drive it through the gateway
// against the in-memory demo fleet.

use std::path::Path;
use std::sync::Arc;

use anyhow::bail;

use fg_actions::{fleet_catalog, ActionRegistry, SystemClock};
use fg_capability::SigningKey;
use fg_gateway::{AuthorizationGateway, GatewayConfig, PlanRunState};
use fg_policy::Actor;

use super::read_plan;
use crate::fleet::DemoFleet;

pub async fn execute(
    config: &GatewayConfig,
    plan_path: &Path,
    user: &str,
    roles: Vec<String>,
    ephemeral_key: bool,
) -> anyhow::Result<()> {
    let plan = read_plan(plan_path)?;
    let caller = Actor::new(user, roles);

    let key = if ephemeral_key {
        tracing::warn!("signing with an ephemeral key; tokens will not verify elsewhere");
        SigningKey::generate()
    } else {
        SigningKey::from_env(&config.signing_key_env)?
    };

    let fleet = Arc::new(DemoFleet::seeded());
    let gateway = AuthorizationGateway::with_key(
        config,
        key,
        ActionRegistry::from_definitions(fleet_catalog())?,
        Arc::new(fleet.handlers()?),
        Arc::new(SystemClock),
    )?;

    let mut run = gateway.capture(&caller.identity, plan);
    if let PlanRunState::Denied { reason } = &run.state {
        bail!("plan {} denied: {}", run.run_id, reason);
    }

    let report = gateway.run(&mut run, &caller).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

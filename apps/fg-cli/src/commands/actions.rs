// actions.rs: `fleetgate actions`. Prints the manifest a planner is prompted with.

use fg_actions::{fleet_catalog, ActionRegistry};

pub fn execute() -> anyhow::Result<()> {
    let registry = ActionRegistry::from_definitions(fleet_catalog())?;
    println!("{}", serde_json::to_string_pretty(&registry.manifest())?);
    Ok(())
}

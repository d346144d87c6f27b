pub mod actions;
pub mod inspect;
pub mod keygen;
pub mod mint;
pub mod run;

use std::path::Path;

use anyhow::Context;

use fg_actions::Plan;

/// Read a plan JSON file.
pub(crate) fn read_plan(path: &Path) -> anyhow::Result<Plan> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read plan {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid plan JSON in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_plan_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        std::fs::write(
            &path,
            r#"{"goal": "restart auth", "steps": [{"action": "infra.restart", "params": {"service_id": "auth"}}]}"#,
        )
        .unwrap();

        let plan = read_plan(&path).unwrap();
        assert_eq!(plan.goal.as_deref(), Some("restart auth"));
        assert_eq!(plan.steps[0].action, "infra.restart");
    }

    #[test]
    fn missing_plan_names_the_path() {
        let err = read_plan(Path::new("/nonexistent/plan.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/plan.json"));
    }
}

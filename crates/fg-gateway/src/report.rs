// report.rs: Per-run outcome record.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::StepFailure;
use crate::run::PlanRunState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed,
    /// Not attempted because an earlier step failed.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub index: usize,
    pub action: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<StepFailure>,
}

impl StepReport {
    pub fn succeeded(index: usize, action: &str, output: Value) -> Self {
        Self {
            index,
            action: action.to_string(),
            status: StepStatus::Succeeded,
            output: Some(output),
            failure: None,
        }
    }

    pub fn failed(index: usize, action: &str, failure: StepFailure) -> Self {
        Self {
            index,
            action: action.to_string(),
            status: StepStatus::Failed,
            output: None,
            failure: Some(failure),
        }
    }

    pub fn skipped(index: usize, action: &str) -> Self {
        Self {
            index,
            action: action.to_string(),
            status: StepStatus::Skipped,
            output: None,
            failure: None,
        }
    }

    /// Human-readable reason for a failed step.
    pub fn reason(&self) -> Option<String> {
        self.failure.as_ref().map(ToString::to_string)
    }
}

/// What happened to every step of one plan run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub subject: String,
    #[serde(flatten)]
    pub state: PlanRunState,
    pub steps: Vec<StepReport>,
}

impl RunReport {
    /// True when no step failed or was skipped.
    pub fn all_succeeded(&self) -> bool {
        self.steps.iter().all(|s| s.status == StepStatus::Succeeded)
    }

    /// The step that aborted the run, if any.
    pub fn first_failure(&self) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.status == StepStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn report_json_shape() {
        let report = RunReport {
            run_id: Uuid::nil(),
            subject: "bob".into(),
            state: PlanRunState::Completed,
            steps: vec![
                StepReport::succeeded(0, "alert.create", json!({"id": "a-1"})),
                StepReport::failed(
                    1,
                    "infra.restart",
                    StepFailure::PolicyDenied {
                        reason: "limit".into(),
                    },
                ),
                StepReport::skipped(2, "data.backup"),
            ],
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["state"], "completed");
        assert_eq!(value["steps"][0]["status"], "succeeded");
        assert_eq!(value["steps"][1]["failure"]["kind"], "policy_denied");
        assert!(value["steps"][2].get("failure").is_none());

        assert!(!report.all_succeeded());
        assert_eq!(report.first_failure().map(|s| s.index), Some(1));
        assert_eq!(
            report.steps[1].reason().as_deref(),
            Some("policy denied: limit")
        );
    }
}

// plan.rs: The plan a planner proposes.
//
// Plans are untrusted input. They are captured once, copied verbatim into a
// capability token, and never mutated afterwards.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameter map of a call. Values are compared with JSON equality.
pub type Params = Map<String, Value>;

/// One proposed call: an action name and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub action: String,
    #[serde(default)]
    pub params: Params,
}

impl PlanStep {
    pub fn new(action: impl Into<String>, params: Params) -> Self {
        Self {
            action: action.into(),
            params,
        }
    }

    /// Whether `requested` carries every bound key of this step with an
    /// identical value. Extra keys in `requested` are ignored.
    pub fn is_satisfied_by(&self, action: &str, requested: &Params) -> bool {
        self.action == action
            && self
                .params
                .iter()
                .all(|(key, bound)| requested.get(key) == Some(bound))
    }
}

/// An ordered list of steps, optionally with the planner's stated goal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default)]
    pub steps: Vec<PlanStep>,
}

impl Plan {
    pub fn new(steps: Vec<PlanStep>) -> Self {
        Self { goal: None, steps }
    }

    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = Some(goal.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Build a [`Params`] map from a `serde_json::json!({...})` object literal.
///
/// Non-object values produce an empty map.
pub fn params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bound_params_are_a_required_subset() {
        let step = PlanStep::new("infra.restart", params(json!({"service_id": "auth"})));

        assert!(step.is_satisfied_by(
            "infra.restart",
            &params(json!({"service_id": "auth", "user_email": "bot@fleet"}))
        ));
        assert!(!step.is_satisfied_by("infra.restart", &params(json!({"service_id": "db"}))));
        assert!(!step.is_satisfied_by("infra.restart", &params(json!({}))));
        assert!(!step.is_satisfied_by("data.backup", &params(json!({"service_id": "auth"}))));
    }

    #[test]
    fn value_types_must_match_exactly() {
        let step = PlanStep::new("data.wipe", params(json!({"confirm": true})));
        assert!(!step.is_satisfied_by("data.wipe", &params(json!({"confirm": "true"}))));
    }

    #[test]
    fn plan_deserializes_without_goal_or_params() {
        let plan: Plan =
            serde_json::from_str(r#"{"steps":[{"action":"security.audit_log"}]}"#).unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert!(plan.steps[0].params.is_empty());
        assert!(plan.goal.is_none());
    }
}

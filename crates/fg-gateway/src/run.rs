// run.rs: PlanRun lifecycle state machine.
//
// One PlanRun per captured plan:
//
//   Captured → Authorized → Executing → Completed
//       │
//       ├──→ Denied     (token could not be minted; terminal)
//       └──→ Completed  (empty plan; nothing to authorize)

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fg_actions::Plan;
use fg_capability::SignedToken;

use crate::error::GatewayError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlanRunState {
    /// Plan accepted, no token yet.
    Captured,
    Authorized,
    /// Minting failed. Terminal.
    Denied { reason: String },
    Executing,
    /// Every step was attempted or skipped. Terminal.
    Completed,
}

impl fmt::Display for PlanRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanRunState::Captured => write!(f, "captured"),
            PlanRunState::Authorized => write!(f, "authorized"),
            PlanRunState::Denied { .. } => write!(f, "denied"),
            PlanRunState::Executing => write!(f, "executing"),
            PlanRunState::Completed => write!(f, "completed"),
        }
    }
}

impl PlanRunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlanRunState::Denied { .. } | PlanRunState::Completed)
    }

    pub fn can_transition_to(&self, next: &PlanRunState) -> bool {
        matches!(
            (self, next),
            (PlanRunState::Captured, PlanRunState::Authorized)
                | (PlanRunState::Captured, PlanRunState::Denied { .. })
                | (PlanRunState::Captured, PlanRunState::Completed)
                | (PlanRunState::Authorized, PlanRunState::Executing)
                | (PlanRunState::Executing, PlanRunState::Completed)
        )
    }
}

/// A captured plan and where it is in its lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRun {
    pub run_id: Uuid,
    /// Identity the plan was captured for.
    pub subject: String,
    pub plan: Plan,
    pub state: PlanRunState,
    /// Present once the run is authorized.
    pub token: Option<SignedToken>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlanRun {
    pub fn new(subject: impl Into<String>, plan: Plan) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            subject: subject.into(),
            plan,
            state: PlanRunState::Captured,
            token: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn transition(&mut self, next: PlanRunState) -> Result<(), GatewayError> {
        if !self.state.can_transition_to(&next) {
            return Err(GatewayError::InvalidTransition {
                run_id: self.run_id,
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!(run_id = %self.run_id, from = %self.state, to = %next, "plan run transition");
        self.state = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub(crate) fn authorize(&mut self, token: SignedToken) -> Result<(), GatewayError> {
        self.transition(PlanRunState::Authorized)?;
        self.token = Some(token);
        Ok(())
    }
}

// error.rs: Error types for the authorization gateway.
//
// GatewayError covers setup and lifecycle misuse. A step that is refused or
// fails while a plan runs is a StepFailure, recorded in the run report.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use fg_actions::ActionError;
use fg_capability::{CapabilityError, Rejection};
use fg_policy::PolicyError;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Signing key or token setup failed. Fatal at startup.
    #[error("capability configuration error: {0}")]
    Capability(#[from] CapabilityError),

    /// The policy rule table did not compile.
    #[error("policy configuration error: {0}")]
    Policy(#[from] PolicyError),

    /// A config file could not be read.
    #[error("failed to read {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A config file was read but does not parse.
    #[error("invalid config {path}: {reason}")]
    ConfigParse { path: PathBuf, reason: String },

    #[error("invalid transition for plan run {run_id}: {from} -> {to}")]
    InvalidTransition { run_id: Uuid, from: String, to: String },

    /// An authorized run has lost its token.
    #[error("plan run {0} has no capability token")]
    MissingToken(Uuid),
}

/// Why a single step did not run to completion.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepFailure {
    #[error("token rejected: {rejection}")]
    TokenRejected { rejection: Rejection },

    #[error("policy denied: {reason}")]
    PolicyDenied { reason: String },

    #[error("invalid parameters: {message}")]
    InvalidParameters { message: String },

    #[error("executor failed: {message}")]
    ExecutorFailed { message: String },

    #[error("executor timed out after {after_ms} ms")]
    TimedOut { after_ms: u64 },
}

impl StepFailure {
    pub fn is_replay(&self) -> bool {
        matches!(
            self,
            StepFailure::TokenRejected {
                rejection: Rejection::Replay
            }
        )
    }
}

impl From<Rejection> for StepFailure {
    fn from(rejection: Rejection) -> Self {
        StepFailure::TokenRejected { rejection }
    }
}

impl From<ActionError> for StepFailure {
    fn from(e: ActionError) -> Self {
        StepFailure::InvalidParameters {
            message: e.to_string(),
        }
    }
}

//! # fg-gateway
//!
//! The Fleetgate authorization gateway.
//!
//! Sits between a planner and the resource executor. A plan is captured and
//! bound to a capability token; every step is then checked against that
//! token and the role policy before it is dispatched, with a bounded
//! timeout on the executor call.
//!
//! ## Key components
//!
//! - [`AuthorizationGateway`]: `capture`, `execute_step`, and `run`.
//! - [`PlanRun`] / [`PlanRunState`]: per-plan lifecycle.
//! - [`RunReport`]: per-step outcome, serializable for logs and the CLI.
//! - [`StepFailure`]: why a step was refused or failed.
//! - [`GatewayConfig`]: TOML/YAML configuration.

pub mod config;
pub mod error;
pub mod gateway;
pub mod report;
pub mod run;

pub use config::{GatewayConfig, DEFAULT_SIGNING_KEY_ENV};
pub use error::{GatewayError, StepFailure};
pub use gateway::AuthorizationGateway;
pub use report::{RunReport, StepReport, StepStatus};
pub use run::{PlanRun, PlanRunState};

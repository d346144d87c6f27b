//! # fg-policy
//!
//! Role-based policy engine for Fleetgate.
//!
//! The [`PolicyEngine`] decides whether an authenticated [`Actor`] may run a
//! given action with given parameters, and records quota consumption after
//! an action succeeds.
//!
//! ## Key invariants
//!
//! - **Identity binding first**: a request whose `agent_id` names someone
//!   other than the caller is denied before any role is considered, so an
//!   admin role cannot launder a spoofed identity.
//! - **Decisions are side-effect free**: [`PolicyEngine::allow`] only reads
//!   the rate-limit history. Quota is committed by [`PolicyEngine::consume`],
//!   which the caller invokes after the action succeeded.
//! - **Default deny**: an action no rule covers is denied for non-admins.

pub mod actor;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;

pub use actor::Actor;
pub use config::{ActionRule, PolicyConfig, MAX_WINDOW_SECS};
pub use engine::{EvaluationStep, EvaluationTrace, PolicyDecision, PolicyEngine};
pub use error::PolicyError;
pub use history::ActorHistory;

//! # fg-actions
//!
//! The catalog of actions a planner may propose, and the boundary to the
//! resource executor that performs them.
//!
//! ## Key components
//!
//! - [`ActionDefinition`]: a named action and its declared parameters
//! - [`ActionRegistry`]: read-only name → definition map built at startup,
//!   with structural parameter validation before dispatch
//! - [`Plan`] / [`PlanStep`]: the ordered (action, params) list a planner emits
//! - [`Executor`] / [`ActionHandler`]: the uniform `(params) -> Result` contract
//!   for resource handlers, and [`HandlerRegistry`] which routes by name
//! - [`BlockingHandler`]: runs a synchronous handler off the async runtime
//! - [`fleet_catalog`]: the built-in fleet administration actions
//! - [`Clock`]: injectable time, shared by token expiry and rate windows

pub mod catalog;
pub mod clock;
pub mod definition;
pub mod error;
pub mod executor;
pub mod plan;
pub mod registry;

pub use catalog::fleet_catalog;
pub use clock::{Clock, ManualClock, SystemClock};
pub use definition::{ActionDefinition, ParamSpec, ParamType};
pub use error::{ActionError, ExecutorError, HandlerError};
pub use executor::{ActionHandler, BlockingHandler, Executor, HandlerRegistry};
pub use plan::{params, Params, Plan, PlanStep};
pub use registry::{ActionManifest, ActionRegistry};

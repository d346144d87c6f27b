// error.rs: Error types for the action registry and executor boundary.

use thiserror::Error;

use crate::definition::ParamType;

/// Errors raised while registering actions or checking parameter shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// An action with this name is already registered.
    #[error("action '{0}' is already registered")]
    DuplicateAction(String),

    /// A handler for this action is already registered.
    #[error("a handler for '{0}' is already registered")]
    DuplicateHandler(String),

    /// No action with this name exists in the registry.
    #[error("action '{0}' not found")]
    NotFound(String),

    /// A required parameter was not supplied.
    #[error("action '{action}' is missing required parameter '{param}'")]
    MissingParameter { action: String, param: String },

    /// A parameter was supplied with the wrong JSON type.
    #[error("parameter '{param}' of '{action}' must be {expected}, got {found}")]
    TypeMismatch {
        action: String,
        param: String,
        expected: ParamType,
        found: String,
    },
}

/// A domain failure reported by a resource handler (e.g. target not found).
///
/// Run reports keep only its rendered message, prefixed with the action name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// The targeted resource does not exist.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: String, id: String },

    /// The resource exists but is in a state that forbids the action.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Parameters passed the schema check but were rejected by the handler.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Any other failure inside the handler.
    #[error("{0}")]
    Failed(String),
}

/// Errors returned across the [`Executor`](crate::Executor) boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    /// No handler is registered for the requested action.
    #[error("no handler registered for '{0}'")]
    UnknownAction(String),

    /// The handler ran and reported a domain error.
    #[error("{action} failed: {source}")]
    Handler {
        action: String,
        #[source]
        source: HandlerError,
    },
}

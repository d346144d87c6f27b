// error.rs: Error types for the policy subsystem.

use thiserror::Error;

/// Errors raised while building a policy engine or touching its history.
///
/// None of these escape `PolicyEngine::allow`, which always answers with a
/// decision.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A rule's action pattern is malformed and cannot be parsed as a glob.
    #[error("invalid action pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A rule is structurally valid but meaningless (e.g. a zero window).
    #[error("invalid rule for '{pattern}': {reason}")]
    InvalidRule { pattern: String, reason: String },

    /// The history lock was poisoned by a panicking writer.
    #[error("rate-limit history unavailable: lock poisoned")]
    HistoryPoisoned,
}

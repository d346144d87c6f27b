// error.rs: Error types for token minting and key handling.
//
// These are configuration or encoding failures. A token that fails
// validation is not an error; see `Rejection`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The signing key environment variable is unset or empty.
    #[error("signing key not configured: set {var}")]
    MissingSigningKey { var: String },

    /// Key material is present but unusable (bad encoding, too short).
    #[error("invalid signing key: {0}")]
    InvalidSigningKey(String),

    /// Token settings are out of range.
    #[error("invalid token config: {0}")]
    InvalidConfig(String),

    /// The token string does not have the `claims.signature` shape or its
    /// claims do not decode.
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

//! # fg-capability
//!
//! Capability tokens for Fleetgate.
//!
//! A [`TokenAuthority`] mints a signed, time-limited token from a captured
//! plan and later validates presentations of that token against a requested
//! (action, params, subject) triple.
//!
//! ## Key components
//!
//! - [`CapabilityToken`]: the claims: subject, validity window, nonce, and
//!   the verbatim list of bound actions.
//! - [`SigningKey`]: HMAC-SHA256 key material, loaded from the environment.
//! - [`TokenAuthority`]: mint, validate, and the used-token set that makes
//!   every token single-presentation.
//!
//! ## Wire format
//!
//! `base64url(claims JSON) "." base64url(HMAC-SHA256(key, first segment))`,
//! both segments unpadded.

pub mod authority;
pub mod error;
pub mod key;
pub mod token;

pub use authority::{
    ReplayScope, Rejection, TokenAuthority, TokenConfig, ValidationOutcome, MAX_TTL_SECS,
};
pub use error::CapabilityError;
pub use key::SigningKey;
pub use token::{decode_unverified, verify_with, CapabilityToken, SignedToken, TOKEN_ISSUER};

// key.rs: HMAC signing key material.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use ring::hmac;

use crate::error::CapabilityError;

/// Shortest key accepted, in bytes.
pub const MIN_KEY_LEN: usize = 32;

/// Secret used to sign and verify tokens.
///
/// Stored as standard base64 in the environment. `Debug` never prints the
/// bytes.
#[derive(Clone)]
pub struct SigningKey {
    bytes: Vec<u8>,
}

impl SigningKey {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, CapabilityError> {
        let bytes = bytes.into();
        if bytes.len() < MIN_KEY_LEN {
            return Err(CapabilityError::InvalidSigningKey(format!(
                "key is {} bytes, need at least {}",
                bytes.len(),
                MIN_KEY_LEN
            )));
        }
        Ok(Self { bytes })
    }

    pub fn from_base64(encoded: &str) -> Result<Self, CapabilityError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CapabilityError::InvalidSigningKey(format!("not base64: {}", e)))?;
        Self::from_bytes(bytes)
    }

    /// Read a base64 key from the environment variable `var`.
    pub fn from_env(var: &str) -> Result<Self, CapabilityError> {
        match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => Self::from_base64(&value),
            _ => Err(CapabilityError::MissingSigningKey {
                var: var.to_string(),
            }),
        }
    }

    /// A fresh random key of [`MIN_KEY_LEN`] bytes.
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; MIN_KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub(crate) fn hmac_key(&self) -> hmac::Key {
        hmac::Key::new(hmac::HMAC_SHA256, &self.bytes)
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_keys_are_rejected() {
        let err = SigningKey::from_bytes(vec![7u8; 16]).unwrap_err();
        assert!(matches!(err, CapabilityError::InvalidSigningKey(_)));
    }

    #[test]
    fn base64_round_trip_preserves_key() {
        let key = SigningKey::generate();
        let restored = SigningKey::from_base64(&key.to_base64()).unwrap();
        assert_eq!(key.bytes, restored.bytes);
    }

    #[test]
    fn garbage_base64_is_invalid() {
        assert!(matches!(
            SigningKey::from_base64("not base64 at all!"),
            Err(CapabilityError::InvalidSigningKey(_))
        ));
    }

    #[test]
    fn unset_env_var_is_missing_key() {
        let err = SigningKey::from_env("FLEETGATE_TEST_KEY_THAT_IS_NEVER_SET").unwrap_err();
        assert!(matches!(err, CapabilityError::MissingSigningKey { .. }));
        assert!(err.to_string().contains("FLEETGATE_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn debug_hides_key_bytes() {
        let key = SigningKey::from_bytes(vec![0xAB; 32]).unwrap();
        let shown = format!("{:?}", key);
        assert!(!shown.contains("171"));
        assert!(shown.contains("len: 32"));
    }
}

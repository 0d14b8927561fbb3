//! Process-wide signing secret

use std::fmt;

use super::error::ConfigurationError;

/// Minimum accepted secret length in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Validated HMAC secret.
///
/// Built once from configuration at startup and never mutated. Rotating it
/// invalidates every outstanding token.
#[derive(Clone)]
pub struct SigningKey {
    bytes: Vec<u8>,
}

impl SigningKey {
    /// Validate and wrap secret material.
    ///
    /// # Errors
    ///
    /// - `MissingSecret` if `secret` is empty or only whitespace
    /// - `WeakSecret` if it is shorter than [`MIN_SECRET_LEN`] bytes
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, ConfigurationError> {
        let secret = secret.as_ref();
        if secret.iter().all(u8::is_ascii_whitespace) {
            return Err(ConfigurationError::MissingSecret);
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigurationError::WeakSecret {
                length: secret.len(),
                minimum: MIN_SECRET_LEN,
            });
        }
        Ok(Self {
            bytes: secret.to_vec(),
        })
    }

    pub(crate) fn expose(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

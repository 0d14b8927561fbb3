//! Session authority error types

/// Fatal problems with the signing configuration. Raised once at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// No secret was supplied
    #[error("Session signing secret is missing or empty")]
    MissingSecret,

    /// Secret is too short to be a reasonable HMAC key
    #[error("Session signing secret is too short: {length} bytes, at least {minimum} required")]
    WeakSecret { length: usize, minimum: usize },

    /// The MAC implementation refused the key
    #[error("Session signing secret was rejected by the MAC implementation")]
    InvalidKey,

    /// Token lifetime is not positive or exceeds the supported maximum
    #[error("Session token lifetime must be between 1 and {maximum} seconds, got {seconds}")]
    InvalidLifetime { seconds: i64, maximum: i64 },

    /// Expiry leeway is negative or exceeds the supported maximum
    #[error("Session expiry leeway must be between 0 and {maximum} seconds, got {seconds}")]
    InvalidLeeway { seconds: i64, maximum: i64 },
}

/// Request-scoped token failures.
///
/// The specific kind is for logs only. The request gate collapses every
/// variant into the same denial.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Empty input, wrong segment count, or undecodable segments
    #[error("Malformed token")]
    Malformed,

    /// Signature does not match header and claims
    #[error("Invalid token signature")]
    InvalidSignature,

    /// The validity window has passed
    #[error("Token expired")]
    Expired,

    /// Header names an algorithm other than the configured one
    #[error("Unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Claims could not be serialized at issuance
    #[error("Failed to encode token claims: {0}")]
    Encoding(String),
}

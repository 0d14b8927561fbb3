//! Token signature algorithm

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// HMAC-SHA2 signature algorithm used for session tokens.
///
/// An authority is configured with exactly one algorithm. It signs with it and
/// rejects tokens whose header names any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Algorithm {
    /// HMAC with SHA-256 (default)
    #[default]
    HS256,
    /// HMAC with SHA-384
    HS384,
    /// HMAC with SHA-512
    HS512,
}

impl Algorithm {
    /// Name as it appears in the token header `alg` field
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::HS256 => "HS256",
            Algorithm::HS384 => "HS384",
            Algorithm::HS512 => "HS512",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HS256" => Ok(Algorithm::HS256),
            "HS384" => Ok(Algorithm::HS384),
            "HS512" => Ok(Algorithm::HS512),
            _ => Err(anyhow::anyhow!("Unsupported token algorithm: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_from_str_case_insensitive() {
        assert_eq!(Algorithm::from_str("hs384").unwrap(), Algorithm::HS384);
        assert_eq!(Algorithm::from_str("HS512").unwrap(), Algorithm::HS512);
    }

    #[test]
    fn test_algorithm_rejects_asymmetric_and_none() {
        assert!(Algorithm::from_str("RS256").is_err());
        assert!(Algorithm::from_str("none").is_err());
    }

    #[test]
    fn test_algorithm_display_matches_header_name() {
        assert_eq!(Algorithm::HS256.to_string(), "HS256");
        assert_eq!(Algorithm::default(), Algorithm::HS256);
    }
}

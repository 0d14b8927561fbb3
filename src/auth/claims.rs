//! Credential claims carried inside a session token

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity and validity window embedded in a signed token.
///
/// Wire keys are `id`, `email`, `iat` and `exp`; timestamps are whole seconds
/// since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Primary key of the authenticated user
    #[serde(rename = "id")]
    pub subject_id: i64,
    /// Email of the authenticated user at issuance time
    #[serde(rename = "email")]
    pub subject_email: String,
    /// Issuance instant
    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,
    /// Expiry instant
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

//! Client model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Someone the freelancer bills
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub company: String,
    /// Default billing rate per hour
    pub hourly_rate: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for creating a client
#[derive(Debug, Clone)]
pub struct CreateClientInput {
    pub name: String,
    pub email: String,
    pub company: String,
    pub hourly_rate: f64,
}

/// Validated input for a partial client update
#[derive(Debug, Clone, Default)]
pub struct UpdateClientInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub hourly_rate: Option<f64>,
}

impl UpdateClientInput {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.company.is_none()
            && self.hourly_rate.is_none()
    }
}

/// Request body for client create and update.
///
/// Every field is optional at the wire level so that a missing field surfaces
/// as a validation error rather than a deserialization rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    #[serde(alias = "rate")]
    pub hourly_rate: Option<f64>,
}

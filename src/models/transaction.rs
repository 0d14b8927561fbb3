//! Transaction model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Money received from (positive) or refunded to (negative) a client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    pub client_id: i64,
    pub amount: f64,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateTransactionInput {
    pub client_id: i64,
    pub amount: f64,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTransactionInput {
    pub client_id: Option<i64>,
    pub amount: Option<f64>,
    pub description: Option<String>,
}

impl UpdateTransactionInput {
    pub fn is_empty(&self) -> bool {
        self.client_id.is_none() && self.amount.is_none() && self.description.is_none()
    }
}

/// Request body for transaction create and update
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPayload {
    pub client_id: Option<i64>,
    pub amount: Option<f64>,
    pub description: Option<String>,
}

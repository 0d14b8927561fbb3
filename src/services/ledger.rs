//! Shared pieces of the bookkeeping services
//!
//! Error type and field validation used by the client, time entry and
//! transaction services, plus the per-user dashboard summary.

use crate::db::repositories::{ClientRepository, TimeEntryRepository, TransactionRepository};
use crate::models::LedgerSummary;
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum LedgerServiceError {
    /// Invalid or missing input
    #[error("{0}")]
    ValidationError(String),

    /// Resource doesn't exist for the requesting user
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl LedgerServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }
}

/// Require a present, non-blank text field and return it trimmed
pub(crate) fn required_text(
    value: Option<String>,
    field: &str,
) -> Result<String, LedgerServiceError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(LedgerServiceError::validation(format!("{} is required", field))),
    }
}

/// Validate an optional text field that, when present, must not be blank
pub(crate) fn non_blank(
    value: Option<String>,
    field: &str,
) -> Result<Option<String>, LedgerServiceError> {
    match value {
        Some(v) => required_text(Some(v), field).map(Some),
        None => Ok(None),
    }
}

pub(crate) fn validate_email(email: String) -> Result<String, LedgerServiceError> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(LedgerServiceError::validation("Invalid email format")),
    }
}

pub(crate) fn finite(value: f64, field: &str) -> Result<f64, LedgerServiceError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(LedgerServiceError::validation(format!(
            "{} must be a finite number",
            field
        )))
    }
}

/// Aggregates a user's ledger for the dashboard
pub struct LedgerService {
    clients: Arc<dyn ClientRepository>,
    time_entries: Arc<dyn TimeEntryRepository>,
    transactions: Arc<dyn TransactionRepository>,
}

impl LedgerService {
    pub fn new(
        clients: Arc<dyn ClientRepository>,
        time_entries: Arc<dyn TimeEntryRepository>,
        transactions: Arc<dyn TransactionRepository>,
    ) -> Self {
        Self {
            clients,
            time_entries,
            transactions,
        }
    }

    pub async fn summary(&self, user_id: i64) -> Result<LedgerSummary, LedgerServiceError> {
        Ok(LedgerSummary {
            client_count: self
                .clients
                .count(user_id)
                .await
                .context("Failed to count clients")?,
            time_entry_count: self
                .time_entries
                .count(user_id)
                .await
                .context("Failed to count time entries")?,
            transaction_count: self
                .transactions
                .count(user_id)
                .await
                .context("Failed to count transactions")?,
            total_hours: self
                .time_entries
                .total_hours(user_id)
                .await
                .context("Failed to sum hours")?,
            total_amount: self
                .transactions
                .total_amount(user_id)
                .await
                .context("Failed to sum amounts")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text() {
        assert_eq!(
            required_text(Some("  Acme ".to_string()), "Name").unwrap(),
            "Acme"
        );
        assert!(required_text(Some("   ".to_string()), "Name").is_err());
        let err = required_text(None, "Name").unwrap_err();
        assert_eq!(err.to_string(), "Name is required");
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@b.com".to_string()).is_ok());
        assert!(validate_email("no-at-sign".to_string()).is_err());
        assert!(validate_email("@b.com".to_string()).is_err());
        assert!(validate_email("a@".to_string()).is_err());
    }

    #[test]
    fn test_finite() {
        assert!(finite(12.5, "Amount").is_ok());
        assert!(finite(f64::NAN, "Amount").is_err());
        assert!(finite(f64::INFINITY, "Amount").is_err());
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(
            LedgerServiceError::NotFound("Client").to_string(),
            "Client not found"
        );
    }
}

//! Client service

use crate::db::repositories::ClientRepository;
use crate::models::{Client, ClientPayload, CreateClientInput, UpdateClientInput};
use crate::services::ledger::{finite, non_blank, required_text, validate_email, LedgerServiceError};
use anyhow::Context;
use std::sync::Arc;

pub struct ClientService {
    repo: Arc<dyn ClientRepository>,
}

impl ClientService {
    pub fn new(repo: Arc<dyn ClientRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<Client>, LedgerServiceError> {
        Ok(self
            .repo
            .list(user_id)
            .await
            .context("Failed to list clients")?)
    }

    pub async fn get(&self, user_id: i64, id: i64) -> Result<Client, LedgerServiceError> {
        self.repo
            .get(user_id, id)
            .await
            .context("Failed to get client")?
            .ok_or(LedgerServiceError::NotFound("Client"))
    }

    /// Create a client. `name` and `email` are required.
    pub async fn create(
        &self,
        user_id: i64,
        payload: ClientPayload,
    ) -> Result<Client, LedgerServiceError> {
        let input = validate_create(payload)?;
        Ok(self
            .repo
            .create(user_id, &input)
            .await
            .context("Failed to create client")?)
    }

    /// Update the fields present in `payload`
    pub async fn update(
        &self,
        user_id: i64,
        id: i64,
        payload: ClientPayload,
    ) -> Result<Client, LedgerServiceError> {
        let input = validate_update(payload)?;
        self.repo
            .update(user_id, id, &input)
            .await
            .context("Failed to update client")?
            .ok_or(LedgerServiceError::NotFound("Client"))
    }

    /// Delete a client together with its time entries and transactions
    pub async fn delete(&self, user_id: i64, id: i64) -> Result<(), LedgerServiceError> {
        if self
            .repo
            .delete(user_id, id)
            .await
            .context("Failed to delete client")?
        {
            Ok(())
        } else {
            Err(LedgerServiceError::NotFound("Client"))
        }
    }
}

fn validate_hourly_rate(rate: f64) -> Result<f64, LedgerServiceError> {
    let rate = finite(rate, "Hourly rate")?;
    if rate < 0.0 {
        return Err(LedgerServiceError::validation(
            "Hourly rate cannot be negative",
        ));
    }
    Ok(rate)
}

fn validate_create(payload: ClientPayload) -> Result<CreateClientInput, LedgerServiceError> {
    let name = required_text(payload.name, "Name")?;
    let email = validate_email(required_text(payload.email, "Email")?)?;
    let hourly_rate = payload
        .hourly_rate
        .map(validate_hourly_rate)
        .transpose()?
        .unwrap_or(0.0);

    Ok(CreateClientInput {
        name,
        email,
        company: payload.company.map(|c| c.trim().to_string()).unwrap_or_default(),
        hourly_rate,
    })
}

fn validate_update(payload: ClientPayload) -> Result<UpdateClientInput, LedgerServiceError> {
    let input = UpdateClientInput {
        name: non_blank(payload.name, "Name")?,
        email: non_blank(payload.email, "Email")?
            .map(validate_email)
            .transpose()?,
        company: payload.company.map(|c| c.trim().to_string()),
        hourly_rate: payload.hourly_rate.map(validate_hourly_rate).transpose()?,
    };

    if input.is_empty() {
        return Err(LedgerServiceError::validation("No fields to update"));
    }
    Ok(input)
}

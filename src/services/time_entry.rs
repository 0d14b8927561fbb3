//! Time entry service
//!
//! Entries must point at a client owned by the same user. Dates are
//! `YYYY-MM-DD`; optional start and end times are `HH:MM` or `HH:MM:SS`.

use crate::db::repositories::{ClientRepository, TimeEntryRepository};
use crate::models::{CreateTimeEntryInput, TimeEntry, TimeEntryPayload, UpdateTimeEntryInput};
use crate::services::ledger::{finite, non_blank, required_text, LedgerServiceError};
use anyhow::Context;
use chrono::{NaiveDate, NaiveTime};
use std::sync::Arc;

pub struct TimeEntryService {
    entries: Arc<dyn TimeEntryRepository>,
    clients: Arc<dyn ClientRepository>,
}

impl TimeEntryService {
    pub fn new(entries: Arc<dyn TimeEntryRepository>, clients: Arc<dyn ClientRepository>) -> Self {
        Self { entries, clients }
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<TimeEntry>, LedgerServiceError> {
        Ok(self
            .entries
            .list(user_id)
            .await
            .context("Failed to list time entries")?)
    }

    /// Entries for one of the user's clients
    pub async fn list_by_client(
        &self,
        user_id: i64,
        client_id: i64,
    ) -> Result<Vec<TimeEntry>, LedgerServiceError> {
        if !self.owns_client(user_id, client_id).await? {
            return Err(LedgerServiceError::NotFound("Client"));
        }
        Ok(self
            .entries
            .list_by_client(user_id, client_id)
            .await
            .context("Failed to list time entries for client")?)
    }

    pub async fn get(&self, user_id: i64, id: i64) -> Result<TimeEntry, LedgerServiceError> {
        self.entries
            .get(user_id, id)
            .await
            .context("Failed to get time entry")?
            .ok_or(LedgerServiceError::NotFound("Time entry"))
    }

    pub async fn create(
        &self,
        user_id: i64,
        payload: TimeEntryPayload,
    ) -> Result<TimeEntry, LedgerServiceError> {
        let input = validate_create(payload)?;
        self.require_client(user_id, input.client_id).await?;

        Ok(self
            .entries
            .create(user_id, &input)
            .await
            .context("Failed to create time entry")?)
    }

    pub async fn update(
        &self,
        user_id: i64,
        id: i64,
        payload: TimeEntryPayload,
    ) -> Result<TimeEntry, LedgerServiceError> {
        let input = validate_update(payload)?;
        if let Some(client_id) = input.client_id {
            self.require_client(user_id, client_id).await?;
        }

        self.entries
            .update(user_id, id, &input)
            .await
            .context("Failed to update time entry")?
            .ok_or(LedgerServiceError::NotFound("Time entry"))
    }

    pub async fn delete(&self, user_id: i64, id: i64) -> Result<(), LedgerServiceError> {
        if self
            .entries
            .delete(user_id, id)
            .await
            .context("Failed to delete time entry")?
        {
            Ok(())
        } else {
            Err(LedgerServiceError::NotFound("Time entry"))
        }
    }

    async fn owns_client(&self, user_id: i64, client_id: i64) -> Result<bool, LedgerServiceError> {
        Ok(self
            .clients
            .get(user_id, client_id)
            .await
            .context("Failed to look up client")?
            .is_some())
    }

    async fn require_client(&self, user_id: i64, client_id: i64) -> Result<(), LedgerServiceError> {
        if self.owns_client(user_id, client_id).await? {
            Ok(())
        } else {
            Err(LedgerServiceError::validation(
                "clientId does not refer to one of your clients",
            ))
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, LedgerServiceError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| LedgerServiceError::validation("Date must be formatted as YYYY-MM-DD"))
}

/// Empty string clears the time; anything else must parse
fn parse_time(value: String, field: &str) -> Result<Option<String>, LedgerServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let valid = NaiveTime::parse_from_str(value, "%H:%M:%S").is_ok()
        || NaiveTime::parse_from_str(value, "%H:%M").is_ok();
    if valid {
        Ok(Some(value.to_string()))
    } else {
        Err(LedgerServiceError::validation(format!(
            "{} must be formatted as HH:MM",
            field
        )))
    }
}

fn validate_duration(duration: f64) -> Result<f64, LedgerServiceError> {
    let duration = finite(duration, "Duration")?;
    if duration <= 0.0 {
        return Err(LedgerServiceError::validation(
            "Duration must be greater than zero",
        ));
    }
    Ok(duration)
}

fn validate_create(payload: TimeEntryPayload) -> Result<CreateTimeEntryInput, LedgerServiceError> {
    let client_id = payload
        .client_id
        .ok_or_else(|| LedgerServiceError::validation("clientId is required"))?;
    let date = parse_date(&required_text(payload.date, "Date")?)?;
    let description = required_text(payload.description, "Description")?;
    let duration = payload
        .duration
        .ok_or_else(|| LedgerServiceError::validation("Duration is required"))
        .and_then(validate_duration)?;

    Ok(CreateTimeEntryInput {
        client_id,
        description,
        date,
        start_time: payload
            .start_time
            .map(|t| parse_time(t, "Start time"))
            .transpose()?
            .flatten(),
        end_time: payload
            .end_time
            .map(|t| parse_time(t, "End time"))
            .transpose()?
            .flatten(),
        duration,
    })
}

fn validate_update(payload: TimeEntryPayload) -> Result<UpdateTimeEntryInput, LedgerServiceError> {
    let input = UpdateTimeEntryInput {
        client_id: payload.client_id,
        description: non_blank(payload.description, "Description")?,
        date: payload.date.as_deref().map(parse_date).transpose()?,
        start_time: payload
            .start_time
            .map(|t| parse_time(t, "Start time"))
            .transpose()?,
        end_time: payload
            .end_time
            .map(|t| parse_time(t, "End time"))
            .transpose()?,
        duration: payload.duration.map(validate_duration).transpose()?,
    };

    if input.is_empty() {
        return Err(LedgerServiceError::validation("No fields to update"));
    }
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::client::tests::{client_input, setup_with_users};
    use crate::db::repositories::{SqlxClientRepository, SqlxTimeEntryRepository};

    struct Fixture {
        service: TimeEntryService,
        alice: i64,
        bob: i64,
        alice_client: i64,
        bob_client: i64,
    }

    async fn setup() -> Fixture {
        let (pool, alice, bob) = setup_with_users().await;
        let clients = SqlxClientRepository::boxed(pool.clone());
        let alice_client = clients.create(alice, &client_input("Acme")).await.unwrap().id;
        let bob_client = clients.create(bob, &client_input("Initech")).await.unwrap().id;

        Fixture {
            service: TimeEntryService::new(SqlxTimeEntryRepository::boxed(pool), clients),
            alice,
            bob,
            alice_client,
            bob_client,
        }
    }

    fn payload(client_id: i64) -> TimeEntryPayload {
        TimeEntryPayload {
            client_id: Some(client_id),
            description: Some("Wireframes".to_string()),
            date: Some("2024-03-05".to_string()),
            start_time: Some("09:00".to_string()),
            end_time: Some("11:30".to_string()),
            duration: Some(2.5),
        }
    }

    #[tokio::test]
    async fn test_create_time_entry() {
        let f = setup().await;

        let entry = f.service.create(f.alice, payload(f.alice_client)).await.unwrap();
        assert_eq!(entry.client_id, f.alice_client);
        assert_eq!(entry.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(entry.start_time.as_deref(), Some("09:00"));
        assert_eq!(entry.duration, 2.5);
    }

    #[tokio::test]
    async fn test_create_rejects_foreign_client() {
        let f = setup().await;

        let result = f.service.create(f.alice, payload(f.bob_client)).await;
        assert!(matches!(result, Err(LedgerServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_create_validation() {
        let f = setup().await;

        let mut missing_client = payload(f.alice_client);
        missing_client.client_id = None;
        let mut bad_date = payload(f.alice_client);
        bad_date.date = Some("05/03/2024".to_string());
        let mut zero_duration = payload(f.alice_client);
        zero_duration.duration = Some(0.0);
        let mut bad_time = payload(f.alice_client);
        bad_time.start_time = Some("9am".to_string());
        let mut no_description = payload(f.alice_client);
        no_description.description = None;

        for p in [missing_client, bad_date, zero_duration, bad_time, no_description] {
            assert!(matches!(
                f.service.create(f.alice, p).await,
                Err(LedgerServiceError::ValidationError(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_list_by_client_scoped() {
        let f = setup().await;
        f.service.create(f.alice, payload(f.alice_client)).await.unwrap();
        f.service.create(f.bob, payload(f.bob_client)).await.unwrap();

        let entries = f.service.list_by_client(f.alice, f.alice_client).await.unwrap();
        assert_eq!(entries.len(), 1);

        assert!(matches!(
            f.service.list_by_client(f.alice, f.bob_client).await,
            Err(LedgerServiceError::NotFound("Client"))
        ));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let f = setup().await;
        let entry = f.service.create(f.alice, payload(f.alice_client)).await.unwrap();

        let updated = f
            .service
            .update(
                f.alice,
                entry.id,
                TimeEntryPayload {
                    duration: Some(3.0),
                    start_time: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.duration, 3.0);
        assert!(updated.start_time.is_none());
        assert_eq!(updated.end_time.as_deref(), Some("11:30"));

        assert!(matches!(
            f.service.update(f.alice, entry.id, TimeEntryPayload::default()).await,
            Err(LedgerServiceError::ValidationError(_))
        ));
        assert!(matches!(
            f.service.get(f.bob, entry.id).await,
            Err(LedgerServiceError::NotFound("Time entry"))
        ));

        f.service.delete(f.alice, entry.id).await.unwrap();
        assert!(matches!(
            f.service.delete(f.alice, entry.id).await,
            Err(LedgerServiceError::NotFound("Time entry"))
        ));
    }
}

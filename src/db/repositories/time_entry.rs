//! Time entry repository

use crate::db::DynDatabasePool;
use crate::models::{CreateTimeEntryInput, TimeEntry, UpdateTimeEntryInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};
use std::sync::Arc;

#[async_trait]
pub trait TimeEntryRepository: Send + Sync {
    async fn create(&self, user_id: i64, input: &CreateTimeEntryInput) -> Result<TimeEntry>;

    /// All entries of a user, most recent work day first
    async fn list(&self, user_id: i64) -> Result<Vec<TimeEntry>>;

    async fn list_by_client(&self, user_id: i64, client_id: i64) -> Result<Vec<TimeEntry>>;

    async fn get(&self, user_id: i64, id: i64) -> Result<Option<TimeEntry>>;

    async fn update(
        &self,
        user_id: i64,
        id: i64,
        input: &UpdateTimeEntryInput,
    ) -> Result<Option<TimeEntry>>;

    async fn delete(&self, user_id: i64, id: i64) -> Result<bool>;

    async fn count(&self, user_id: i64) -> Result<i64>;

    /// Sum of `duration` over the user's entries
    async fn total_hours(&self, user_id: i64) -> Result<f64>;
}

pub struct SqlxTimeEntryRepository {
    pool: DynDatabasePool,
}

impl SqlxTimeEntryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TimeEntryRepository> {
        Arc::new(Self::new(pool))
    }
}

const TIME_ENTRY_COLUMNS: &str = "id, user_id, client_id, description, date, start_time, end_time, duration, created_at, updated_at";

#[async_trait]
impl TimeEntryRepository for SqlxTimeEntryRepository {
    async fn create(&self, user_id: i64, input: &CreateTimeEntryInput) -> Result<TimeEntry> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO time_entries
                (user_id, client_id, description, date, start_time, end_time, duration, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(input.client_id)
        .bind(&input.description)
        .bind(input.date)
        .bind(input.start_time.as_deref())
        .bind(input.end_time.as_deref())
        .bind(input.duration)
        .bind(now)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create time entry")?;

        Ok(TimeEntry {
            id: result.last_insert_rowid(),
            user_id,
            client_id: input.client_id,
            description: input.description.clone(),
            date: input.date,
            start_time: input.start_time.clone(),
            end_time: input.end_time.clone(),
            duration: input.duration,
            created_at: now,
            updated_at: now,
        })
    }

    async fn list(&self, user_id: i64) -> Result<Vec<TimeEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM time_entries WHERE user_id = ? ORDER BY date DESC, id DESC",
            TIME_ENTRY_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list time entries")?;

        Ok(rows.iter().map(row_to_time_entry).collect())
    }

    async fn list_by_client(&self, user_id: i64, client_id: i64) -> Result<Vec<TimeEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM time_entries WHERE user_id = ? AND client_id = ? ORDER BY date DESC, id DESC",
            TIME_ENTRY_COLUMNS
        ))
        .bind(user_id)
        .bind(client_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list time entries for client")?;

        Ok(rows.iter().map(row_to_time_entry).collect())
    }

    async fn get(&self, user_id: i64, id: i64) -> Result<Option<TimeEntry>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM time_entries WHERE id = ? AND user_id = ?",
            TIME_ENTRY_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get time entry")?;

        Ok(row.as_ref().map(row_to_time_entry))
    }

    async fn update(
        &self,
        user_id: i64,
        id: i64,
        input: &UpdateTimeEntryInput,
    ) -> Result<Option<TimeEntry>> {
        // Optional times use a flag so that an explicit clear can be told
        // apart from "leave unchanged".
        let result = sqlx::query(
            r#"
            UPDATE time_entries
            SET client_id = COALESCE(?, client_id),
                description = COALESCE(?, description),
                date = COALESCE(?, date),
                start_time = CASE WHEN ? THEN ? ELSE start_time END,
                end_time = CASE WHEN ? THEN ? ELSE end_time END,
                duration = COALESCE(?, duration),
                updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(input.client_id)
        .bind(input.description.as_deref())
        .bind(input.date)
        .bind(input.start_time.is_some())
        .bind(input.start_time.clone().flatten())
        .bind(input.end_time.is_some())
        .bind(input.end_time.clone().flatten())
        .bind(input.duration)
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update time entry")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(user_id, id).await
    }

    async fn delete(&self, user_id: i64, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM time_entries WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete time entry")?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, user_id: i64) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM time_entries WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count time entries")?;

        Ok(row.get("count"))
    }

    async fn total_hours(&self, user_id: i64) -> Result<f64> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(duration), 0.0) as total FROM time_entries WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(self.pool.sqlite())
        .await
        .context("Failed to sum time entry hours")?;

        Ok(row.get("total"))
    }
}

fn row_to_time_entry(row: &SqliteRow) -> TimeEntry {
    TimeEntry {
        id: row.get("id"),
        user_id: row.get("user_id"),
        client_id: row.get("client_id"),
        description: row.get("description"),
        date: row.get("date"),
        start_time: row.get("start_time"),
        end_time: row.get("end_time"),
        duration: row.get("duration"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

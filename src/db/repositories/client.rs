//! Client repository
//!
//! Every query is scoped by `user_id`; a row owned by another user is
//! indistinguishable from a missing one.

use crate::db::DynDatabasePool;
use crate::models::{Client, CreateClientInput, UpdateClientInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};
use std::sync::Arc;

#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn create(&self, user_id: i64, input: &CreateClientInput) -> Result<Client>;

    /// All clients of a user, newest first
    async fn list(&self, user_id: i64) -> Result<Vec<Client>>;

    async fn get(&self, user_id: i64, id: i64) -> Result<Option<Client>>;

    /// Apply the provided fields; `None` when the client doesn't exist for this user
    async fn update(
        &self,
        user_id: i64,
        id: i64,
        input: &UpdateClientInput,
    ) -> Result<Option<Client>>;

    /// Returns `false` when nothing was deleted
    async fn delete(&self, user_id: i64, id: i64) -> Result<bool>;

    async fn count(&self, user_id: i64) -> Result<i64>;
}

pub struct SqlxClientRepository {
    pool: DynDatabasePool,
}

impl SqlxClientRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ClientRepository> {
        Arc::new(Self::new(pool))
    }
}

const CLIENT_COLUMNS: &str =
    "id, user_id, name, email, company, hourly_rate, created_at, updated_at";

#[async_trait]
impl ClientRepository for SqlxClientRepository {
    async fn create(&self, user_id: i64, input: &CreateClientInput) -> Result<Client> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO clients (user_id, name, email, company, hourly_rate, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.company)
        .bind(input.hourly_rate)
        .bind(now)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create client")?;

        Ok(Client {
            id: result.last_insert_rowid(),
            user_id,
            name: input.name.clone(),
            email: input.email.clone(),
            company: input.company.clone(),
            hourly_rate: input.hourly_rate,
            created_at: now,
            updated_at: now,
        })
    }

    async fn list(&self, user_id: i64) -> Result<Vec<Client>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM clients WHERE user_id = ? ORDER BY created_at DESC, id DESC",
            CLIENT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list clients")?;

        Ok(rows.iter().map(row_to_client).collect())
    }

    async fn get(&self, user_id: i64, id: i64) -> Result<Option<Client>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM clients WHERE id = ? AND user_id = ?",
            CLIENT_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get client")?;

        Ok(row.as_ref().map(row_to_client))
    }

    async fn update(
        &self,
        user_id: i64,
        id: i64,
        input: &UpdateClientInput,
    ) -> Result<Option<Client>> {
        let result = sqlx::query(
            r#"
            UPDATE clients
            SET name = COALESCE(?, name),
                email = COALESCE(?, email),
                company = COALESCE(?, company),
                hourly_rate = COALESCE(?, hourly_rate),
                updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(input.name.as_deref())
        .bind(input.email.as_deref())
        .bind(input.company.as_deref())
        .bind(input.hourly_rate)
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update client")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(user_id, id).await
    }

    async fn delete(&self, user_id: i64, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM clients WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete client")?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, user_id: i64) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM clients WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count clients")?;

        Ok(row.get("count"))
    }
}

fn row_to_client(row: &SqliteRow) -> Client {
    Client {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        email: row.get("email"),
        company: row.get("company"),
        hourly_rate: row.get("hourly_rate"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

//! Transaction repository

use crate::db::DynDatabasePool;
use crate::models::{CreateTransactionInput, Transaction, UpdateTransactionInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};
use std::sync::Arc;

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn create(&self, user_id: i64, input: &CreateTransactionInput) -> Result<Transaction>;

    async fn list(&self, user_id: i64) -> Result<Vec<Transaction>>;

    async fn list_by_client(&self, user_id: i64, client_id: i64) -> Result<Vec<Transaction>>;

    async fn get(&self, user_id: i64, id: i64) -> Result<Option<Transaction>>;

    async fn update(
        &self,
        user_id: i64,
        id: i64,
        input: &UpdateTransactionInput,
    ) -> Result<Option<Transaction>>;

    async fn delete(&self, user_id: i64, id: i64) -> Result<bool>;

    async fn count(&self, user_id: i64) -> Result<i64>;

    /// Net of all amounts for the user
    async fn total_amount(&self, user_id: i64) -> Result<f64>;
}

pub struct SqlxTransactionRepository {
    pool: DynDatabasePool,
}

impl SqlxTransactionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TransactionRepository> {
        Arc::new(Self::new(pool))
    }
}

const TRANSACTION_COLUMNS: &str =
    "id, user_id, client_id, amount, description, created_at, updated_at";

#[async_trait]
impl TransactionRepository for SqlxTransactionRepository {
    async fn create(&self, user_id: i64, input: &CreateTransactionInput) -> Result<Transaction> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO transactions (user_id, client_id, amount, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(input.client_id)
        .bind(input.amount)
        .bind(&input.description)
        .bind(now)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create transaction")?;

        Ok(Transaction {
            id: result.last_insert_rowid(),
            user_id,
            client_id: input.client_id,
            amount: input.amount,
            description: input.description.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn list(&self, user_id: i64) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM transactions WHERE user_id = ? ORDER BY created_at DESC, id DESC",
            TRANSACTION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list transactions")?;

        Ok(rows.iter().map(row_to_transaction).collect())
    }

    async fn list_by_client(&self, user_id: i64, client_id: i64) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM transactions WHERE user_id = ? AND client_id = ? ORDER BY created_at DESC, id DESC",
            TRANSACTION_COLUMNS
        ))
        .bind(user_id)
        .bind(client_id)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list transactions for client")?;

        Ok(rows.iter().map(row_to_transaction).collect())
    }

    async fn get(&self, user_id: i64, id: i64) -> Result<Option<Transaction>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM transactions WHERE id = ? AND user_id = ?",
            TRANSACTION_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get transaction")?;

        Ok(row.as_ref().map(row_to_transaction))
    }

    async fn update(
        &self,
        user_id: i64,
        id: i64,
        input: &UpdateTransactionInput,
    ) -> Result<Option<Transaction>> {
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET client_id = COALESCE(?, client_id),
                amount = COALESCE(?, amount),
                description = COALESCE(?, description),
                updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(input.client_id)
        .bind(input.amount)
        .bind(input.description.as_deref())
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update transaction")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get(user_id, id).await
    }

    async fn delete(&self, user_id: i64, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete transaction")?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, user_id: i64) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM transactions WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(self.pool.sqlite())
            .await
            .context("Failed to count transactions")?;

        Ok(row.get("count"))
    }

    async fn total_amount(&self, user_id: i64) -> Result<f64> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(amount), 0.0) as total FROM transactions WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(self.pool.sqlite())
        .await
        .context("Failed to sum transaction amounts")?;

        Ok(row.get("total"))
    }
}

fn row_to_transaction(row: &SqliteRow) -> Transaction {
    Transaction {
        id: row.get("id"),
        user_id: row.get("user_id"),
        client_id: row.get("client_id"),
        amount: row.get("amount"),
        description: row.get("description"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

//! Transaction service

use crate::db::repositories::{ClientRepository, TransactionRepository};
use crate::models::{
    CreateTransactionInput, Transaction, TransactionPayload, UpdateTransactionInput,
};
use crate::services::ledger::{finite, LedgerServiceError};
use anyhow::Context;
use std::sync::Arc;

pub struct TransactionService {
    transactions: Arc<dyn TransactionRepository>,
    clients: Arc<dyn ClientRepository>,
}

impl TransactionService {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        clients: Arc<dyn ClientRepository>,
    ) -> Self {
        Self {
            transactions,
            clients,
        }
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<Transaction>, LedgerServiceError> {
        Ok(self
            .transactions
            .list(user_id)
            .await
            .context("Failed to list transactions")?)
    }

    pub async fn list_by_client(
        &self,
        user_id: i64,
        client_id: i64,
    ) -> Result<Vec<Transaction>, LedgerServiceError> {
        if !self.owns_client(user_id, client_id).await? {
            return Err(LedgerServiceError::NotFound("Client"));
        }
        Ok(self
            .transactions
            .list_by_client(user_id, client_id)
            .await
            .context("Failed to list transactions for client")?)
    }

    pub async fn get(&self, user_id: i64, id: i64) -> Result<Transaction, LedgerServiceError> {
        self.transactions
            .get(user_id, id)
            .await
            .context("Failed to get transaction")?
            .ok_or(LedgerServiceError::NotFound("Transaction"))
    }

    /// Record a transaction. Negative amounts are refunds.
    pub async fn create(
        &self,
        user_id: i64,
        payload: TransactionPayload,
    ) -> Result<Transaction, LedgerServiceError> {
        let client_id = payload
            .client_id
            .ok_or_else(|| LedgerServiceError::validation("clientId is required"))?;
        let amount = payload
            .amount
            .ok_or_else(|| LedgerServiceError::validation("Amount is required"))
            .and_then(|a| finite(a, "Amount"))?;
        self.require_client(user_id, client_id).await?;

        let input = CreateTransactionInput {
            client_id,
            amount,
            description: payload
                .description
                .map(|d| d.trim().to_string())
                .unwrap_or_default(),
        };

        Ok(self
            .transactions
            .create(user_id, &input)
            .await
            .context("Failed to create transaction")?)
    }

    pub async fn update(
        &self,
        user_id: i64,
        id: i64,
        payload: TransactionPayload,
    ) -> Result<Transaction, LedgerServiceError> {
        let input = UpdateTransactionInput {
            client_id: payload.client_id,
            amount: payload.amount.map(|a| finite(a, "Amount")).transpose()?,
            description: payload.description.map(|d| d.trim().to_string()),
        };
        if input.is_empty() {
            return Err(LedgerServiceError::validation("No fields to update"));
        }
        if let Some(client_id) = input.client_id {
            self.require_client(user_id, client_id).await?;
        }

        self.transactions
            .update(user_id, id, &input)
            .await
            .context("Failed to update transaction")?
            .ok_or(LedgerServiceError::NotFound("Transaction"))
    }

    pub async fn delete(&self, user_id: i64, id: i64) -> Result<(), LedgerServiceError> {
        if self
            .transactions
            .delete(user_id, id)
            .await
            .context("Failed to delete transaction")?
        {
            Ok(())
        } else {
            Err(LedgerServiceError::NotFound("Transaction"))
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

//! Transaction API endpoints

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, JsonBody, ResourceId};
use crate::api::MessageResponse;
use crate::models::{Transaction, TransactionPayload};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_transactions).post(create_transaction))
        .route(
            "/{id}",
            get(get_transaction)
                .put(update_transaction)
                .delete(delete_transaction),
        )
        .route("/client/{id}", get(list_client_transactions))
}

#[derive(Serialize)]
struct TransactionsResponse {
    transactions: Vec<Transaction>,
}

#[derive(Serialize)]
struct TransactionResponse {
    transaction: Transaction,
}

async fn list_transactions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let transactions = state.transaction_service.list(user.id).await?;
    Ok(Json(TransactionsResponse { transactions }))
}

async fn list_client_transactions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ResourceId(client_id): ResourceId,
) -> Result<impl IntoResponse, ApiError> {
    let transactions = state
        .transaction_service
        .list_by_client(user.id, client_id)
        .await?;
    Ok(Json(TransactionsResponse { transactions }))
}

async fn get_transaction(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ResourceId(id): ResourceId,
) -> Result<impl IntoResponse, ApiError> {
    let transaction = state.transaction_service.get(user.id, id).await?;
    Ok(Json(TransactionResponse { transaction }))
}

async fn create_transaction(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    JsonBody(payload): JsonBody<TransactionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let transaction = state.transaction_service.create(user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(TransactionResponse { transaction })))
}

async fn update_transaction(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ResourceId(id): ResourceId,
    JsonBody(payload): JsonBody<TransactionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let transaction = state
        .transaction_service
        .update(user.id, id, payload)
        .await?;
    Ok(Json(TransactionResponse { transaction }))
}

async fn delete_transaction(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ResourceId(id): ResourceId,
) -> Result<impl IntoResponse, ApiError> {
    state.transaction_service.delete(user.id, id).await?;
    Ok(Json(MessageResponse::new("Transaction deleted successfully")))
}

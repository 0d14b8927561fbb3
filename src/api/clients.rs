//! Client API endpoints

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
use crate::models::{Client, ClientPayload};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_clients).post(create_client))
        .route(
            "/{id}",
            get(get_client).put(update_client).delete(delete_client),
        )
}

#[derive(Serialize)]
struct ClientsResponse {
    clients: Vec<Client>,
}

#[derive(Serialize)]
struct ClientResponse {
    client: Client,
}

async fn list_clients(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let clients = state.client_service.list(user.id).await?;
    Ok(Json(ClientsResponse { clients }))
}

async fn get_client(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ResourceId(id): ResourceId,
) -> Result<impl IntoResponse, ApiError> {
    let client = state.client_service.get(user.id, id).await?;
    Ok(Json(ClientResponse { client }))
}

async fn create_client(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    JsonBody(payload): JsonBody<ClientPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let client = state.client_service.create(user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(ClientResponse { client })))
}

async fn update_client(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ResourceId(id): ResourceId,
    JsonBody(payload): JsonBody<ClientPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let client = state.client_service.update(user.id, id, payload).await?;
    Ok(Json(ClientResponse { client }))
}

async fn delete_client(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ResourceId(id): ResourceId,
) -> Result<impl IntoResponse, ApiError> {
    state.client_service.delete(user.id, id).await?;
    Ok(Json(MessageResponse::new("Client deleted successfully")))
}

//! Time entry API endpoints

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
use crate::models::{TimeEntry, TimeEntryPayload};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_time_entries).post(create_time_entry))
        .route(
            "/{id}",
            get(get_time_entry)
                .put(update_time_entry)
                .delete(delete_time_entry),
        )
        .route("/client/{id}", get(list_client_time_entries))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TimeEntriesResponse {
    time_entries: Vec<TimeEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TimeEntryResponse {
    time_entry: TimeEntry,
}

async fn list_time_entries(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let time_entries = state.time_entry_service.list(user.id).await?;
    Ok(Json(TimeEntriesResponse { time_entries }))
}

async fn list_client_time_entries(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ResourceId(client_id): ResourceId,
) -> Result<impl IntoResponse, ApiError> {
    let time_entries = state
        .time_entry_service
        .list_by_client(user.id, client_id)
        .await?;
    Ok(Json(TimeEntriesResponse { time_entries }))
}

async fn get_time_entry(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ResourceId(id): ResourceId,
) -> Result<impl IntoResponse, ApiError> {
    let time_entry = state.time_entry_service.get(user.id, id).await?;
    Ok(Json(TimeEntryResponse { time_entry }))
}

async fn create_time_entry(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    JsonBody(payload): JsonBody<TimeEntryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let time_entry = state.time_entry_service.create(user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(TimeEntryResponse { time_entry })))
}

async fn update_time_entry(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ResourceId(id): ResourceId,
    JsonBody(payload): JsonBody<TimeEntryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let time_entry = state
        .time_entry_service
        .update(user.id, id, payload)
        .await?;
    Ok(Json(TimeEntryResponse { time_entry }))
}

async fn delete_time_entry(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ResourceId(id): ResourceId,
) -> Result<impl IntoResponse, ApiError> {
    state.time_entry_service.delete(user.id, id).await?;
    Ok(Json(MessageResponse::new("Time entry deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{body_json, create_client, get, register_and_login, send_json, TestApp};
    use axum::http::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_time_entry_lifecycle() {
        let app = TestApp::new().await;
        let cookie = register_and_login(&app, "owner@example.com").await;
        let client_id = create_client(&app, &cookie, "Acme").await;

        let response = app
            .send(send_json(
                Method::POST,
                "/api/time-entries",
                Some(&cookie),
                json!({
                    "clientId": client_id,
                    "description": "Kickoff call",
                    "date": "2024-06-01",
                    "startTime": "10:00",
                    "endTime": "11:00",
                    "duration": 1.0
                }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let entry = body_json(response).await["timeEntry"].clone();
        let id = entry["id"].as_i64().unwrap();
        assert_eq!(entry["date"], "2024-06-01");
        assert_eq!(entry["clientId"], client_id);

        let response = app
            .send(get(&format!("/api/time-entries/client/{}", client_id), Some(&cookie)))
            .await;
        assert_eq!(body_json(response).await["timeEntries"].as_array().unwrap().len(), 1);

        let response = app
            .send(send_json(
                Method::PUT,
                &format!("/api/time-entries/{}", id),
                Some(&cookie),
                json!({ "duration": 1.5, "endTime": "11:30" }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["timeEntry"]["duration"], 1.5);

        let response = app
            .send(send_json(
                Method::DELETE,
                &format!("/api/time-entries/{}", id),
                Some(&cookie),
                json!({}),
            ))
            .await;
        assert_eq!(
            body_json(response).await["message"],
            "Time entry deleted successfully"
        );

        let response = app.send(get("/api/time-entries", Some(&cookie))).await;
        assert!(body_json(response).await["timeEntries"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validation_and_ownership() {
        let app = TestApp::new().await;
        let alice = register_and_login(&app, "alice@example.com").await;
        let bob = register_and_login(&app, "bob@example.com").await;
        let alice_client = create_client(&app, &alice, "Acme").await;

        let response = app
            .send(send_json(
                Method::POST,
                "/api/time-entries",
                Some(&alice),
                json!({ "clientId": alice_client, "description": "x", "date": "2024-06-01", "duration": -1.0 }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .send(send_json(
                Method::POST,
                "/api/time-entries",
                Some(&bob),
                json!({ "clientId": alice_client, "description": "x", "date": "2024-06-01", "duration": 1.0 }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .send(get(&format!("/api/time-entries/client/{}", alice_client), Some(&bob)))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

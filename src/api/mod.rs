//! API layer - HTTP handlers and routing
//!
//! - Identity endpoints under /api/auth plus GET /api/user
//! - Client, time entry and transaction endpoints
//! - Login, register and dashboard pages
//!
//! Every request passes through the request gate before it is routed.

pub mod auth;
pub mod clients;
pub mod gate;
pub mod middleware;
pub mod pages;
pub mod time_entries;
pub mod transactions;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use gate::{GatePolicy, SESSION_COOKIE};
pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// `{ "message": ... }` body returned by deletes
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Build the /api router
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .merge(auth::user_router())
        .nest("/clients", clients::router())
        .nest("/time-entries", time_entries::router())
        .nest("/transactions", transactions::router())
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::COOKIE])
        .allow_credentials(true);

    match origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!(origin, "Ignoring invalid CORS origin");
            cors
        }
    }
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);

    Router::new()
        .nest("/api", build_api_router())
        .merge(pages::router())
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            gate::request_gate,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! API middleware and shared request plumbing
//!
//! Contains:
//! - `AppState`, the services shared by every handler
//! - `ApiError`, the JSON error body whose code determines the status
//! - extractors for the authenticated subject, path ids and JSON bodies

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use anyhow::Context;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;

use crate::api::gate::GatePolicy;
use crate::api::pages::PageRenderer;
use crate::auth::{Claims, SessionAuthority, TokenError};
use crate::config::Config;
use crate::db::repositories::{
    SqlxClientRepository, SqlxTimeEntryRepository, SqlxTransactionRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{
    ClientService, IdentityService, IdentityServiceError, LedgerService, LedgerServiceError,
    LoginRateLimiter, TimeEntryService, TransactionService,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub authority: Arc<SessionAuthority>,
    pub gate: Arc<GatePolicy>,
    pub pages: Arc<PageRenderer>,
    pub rate_limiter: Arc<LoginRateLimiter>,
    pub identity_service: Arc<IdentityService>,
    pub client_service: Arc<ClientService>,
    pub time_entry_service: Arc<TimeEntryService>,
    pub transaction_service: Arc<TransactionService>,
    pub ledger_service: Arc<LedgerService>,
}

impl AppState {
    /// Wire repositories and services over one pool
    pub fn new(
        config: Config,
        pool: DynDatabasePool,
        authority: SessionAuthority,
    ) -> anyhow::Result<Self> {
        let users = SqlxUserRepository::boxed(pool.clone());
        let clients = SqlxClientRepository::boxed(pool.clone());
        let time_entries = SqlxTimeEntryRepository::boxed(pool.clone());
        let transactions = SqlxTransactionRepository::boxed(pool);
        let rate_limiter = Arc::new(LoginRateLimiter::new());
        let pages = PageRenderer::new().context("Failed to load page templates")?;

        Ok(Self {
            gate: Arc::new(GatePolicy::new(&config.gate)),
            pages: Arc::new(pages),
            config: Arc::new(config),
            authority: Arc::new(authority),
            identity_service: Arc::new(IdentityService::new(users, rate_limiter.clone())),
            client_service: Arc::new(ClientService::new(clients.clone())),
            time_entry_service: Arc::new(TimeEntryService::new(
                time_entries.clone(),
                clients.clone(),
            )),
            transaction_service: Arc::new(TransactionService::new(
                transactions.clone(),
                clients.clone(),
            )),
            ledger_service: Arc::new(LedgerService::new(clients, time_entries, transactions)),
            rate_limiter,
        })
    }
}

/// The subject of a verified session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub email: String,
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.subject_id,
            email: claims.subject_email,
        }
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new("RATE_LIMITED", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "RATE_LIMITED" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Log the cause and hide it behind a generic 500
fn internal(error: &anyhow::Error) -> ApiError {
    tracing::error!(error = ?error, "Request failed");
    ApiError::internal_error("Internal server error")
}

impl From<IdentityServiceError> for ApiError {
    fn from(e: IdentityServiceError) -> Self {
        match e {
            IdentityServiceError::MissingCredentials | IdentityServiceError::EmailTaken => {
                ApiError::validation_error(e.to_string())
            }
            IdentityServiceError::InvalidCredentials => ApiError::unauthorized(e.to_string()),
            IdentityServiceError::RateLimited => ApiError::rate_limited(e.to_string()),
            IdentityServiceError::InternalError(ref err) => internal(err),
        }
    }
}

impl From<LedgerServiceError> for ApiError {
    fn from(e: LedgerServiceError) -> Self {
        match e {
            LedgerServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            LedgerServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            LedgerServiceError::InternalError(ref err) => internal(err),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        tracing::error!(error = %e, "Failed to issue session token");
        ApiError::internal_error("Internal server error")
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Numeric `{id}` path segment; anything else is a 400
#[derive(Debug, Clone, Copy)]
pub struct ResourceId(pub i64);

impl<S> FromRequestParts<S> for ResourceId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<i64>::from_request_parts(parts, state)
            .await
            .map(|Path(id)| ResourceId(id))
            .map_err(|_| ApiError::validation_error("Invalid id"))
    }
}

/// JSON body whose rejections come back as `VALIDATION_ERROR`
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| JsonBody(value))
            .map_err(|rejection| ApiError::validation_error(rejection.body_text()))
    }
}

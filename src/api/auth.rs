//! Identity API endpoints
//!
//! - POST /api/auth/register - Create an account (no session is issued)
//! - POST /api/auth/login - Check credentials and set the session cookie
//! - POST /api/auth/logout - Clear the session cookie
//! - GET /api/user - Current user

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::gate::SESSION_COOKIE;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, JsonBody};
use crate::models::UserProfile;
use crate::services::Credentials;

/// Request body for register and login
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: UserProfile,
}

/// Routes under /api/auth
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// Routes under /api
pub fn user_router() -> Router<AppState> {
    Router::new().route("/user", get(current_user))
}

/// `Set-Cookie` value carrying a session token
pub fn session_cookie(token: &str, max_age_seconds: i64) -> String {
    format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
        SESSION_COOKIE, token, max_age_seconds
    )
}

/// `Set-Cookie` value that removes the session cookie
pub fn cleared_session_cookie() -> String {
    session_cookie("", 0)
}

fn set_cookie(value: &str) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(value).map_err(|e| {
        tracing::error!(error = %e, "Invalid Set-Cookie value");
        ApiError::internal_error("Internal server error")
    })?;
    headers.insert(header::SET_COOKIE, value);
    Ok(headers)
}

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CredentialsRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let credentials = Credentials::from_parts(body.email, body.password)?;
    state.identity_service.register(credentials).await?;

    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let credentials = Credentials::from_parts(body.email, body.password)?;
    let user = state.identity_service.authenticate(credentials).await?;

    let token = state.authority.issue(user.id, &user.email)?;
    let headers = set_cookie(&session_cookie(
        token.as_str(),
        state.authority.ttl().num_seconds(),
    ))?;

    tracing::info!(user_id = user.id, "User logged in");
    Ok((
        headers,
        Json(LoginResponse {
            success: true,
            user: UserProfile::from(&user),
        }),
    ))
}

/// POST /api/auth/logout
///
/// Tokens are stateless, so logging out only drops the cookie.
async fn logout() -> Result<impl IntoResponse, ApiError> {
    Ok((StatusCode::NO_CONTENT, set_cookie(&cleared_session_cookie())?))
}

/// GET /api/user
async fn current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state
        .identity_service
        .get_user(user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(UserProfile::from(&user)))
}

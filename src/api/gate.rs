//! Request gate
//!
//! Runs before routing. Public paths pass straight through; every other path
//! needs a `token` cookie that the session authority accepts. A denial only
//! depends on the path's access kind, never on why the token was refused:
//! page routes redirect to `/login`, API routes get a 401 error body.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::auth::SessionAuthority;
use crate::config::{GateConfig, PathAccess, RouteRule};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "token";

/// Where denied page navigations are sent
pub const LOGIN_PATH: &str = "/login";

/// Ordered path rules; the first matching prefix decides
#[derive(Debug, Clone)]
pub struct GatePolicy {
    rules: Vec<RouteRule>,
    fallback: PathAccess,
}

impl GatePolicy {
    pub fn new(config: &GateConfig) -> Self {
        Self {
            rules: config.rules.clone(),
            fallback: config.fallback,
        }
    }

    /// Access required for `path`
    pub fn classify(&self, path: &str) -> PathAccess {
        self.rules
            .iter()
            .find(|rule| prefix_matches(&rule.prefix, path))
            .map(|rule| rule.access)
            .unwrap_or(self.fallback)
    }
}

/// `/api` matches `/api` and `/api/clients` but not `/apiary`
fn prefix_matches(prefix: &str, path: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Value of the session cookie, if present and non-empty
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Outcome of gating one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Let the request through, with the subject when a session was verified
    Admit(Option<AuthenticatedUser>),
    /// Refuse it with the response for this access kind
    Deny(PathAccess),
}

/// Decide whether a request for `path` carrying `headers` may proceed
pub fn evaluate(
    policy: &GatePolicy,
    authority: &SessionAuthority,
    path: &str,
    headers: &HeaderMap,
) -> GateDecision {
    let access = policy.classify(path);
    if access == PathAccess::Public {
        return GateDecision::Admit(None);
    }

    let Some(token) = session_token(headers) else {
        tracing::debug!(path, "No session cookie");
        return GateDecision::Deny(access);
    };

    match authority.verify(token) {
        Ok(claims) => GateDecision::Admit(Some(claims.into())),
        Err(e) => {
            tracing::debug!(path, error = %e, "Session token rejected");
            GateDecision::Deny(access)
        }
    }
}

/// Response for a denied request
pub fn deny(access: PathAccess) -> Response {
    match access {
        PathAccess::Page => Redirect::to(LOGIN_PATH).into_response(),
        PathAccess::Api | PathAccess::Public => {
            ApiError::unauthorized("Authentication required").into_response()
        }
    }
}

/// Gate middleware, installed around the whole router
pub async fn request_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let decision = evaluate(
        &state.gate,
        &state.authority,
        request.uri().path(),
        request.headers(),
    );

    match decision {
        GateDecision::Admit(user) => {
            if let Some(user) = user {
                request.extensions_mut().insert(user);
            }
            next.run(request).await
        }
        GateDecision::Deny(access) => deny(access),
    }
}

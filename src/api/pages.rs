//! Server-rendered pages
//!
//! - GET /login, GET /register - credential forms backed by the identity API
//! - GET /dashboard - the signed-in user's totals (page guarded by the gate)

use axum::{
    extract::State,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use tera::{Context as TeraContext, Tera};

use crate::api::gate::LOGIN_PATH;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};

const TEMPLATES: [(&str, &str); 3] = [
    ("base.html", include_str!("../../templates/base.html")),
    ("login.html", include_str!("../../templates/login.html")),
    ("dashboard.html", include_str!("../../templates/dashboard.html")),
];

/// Tera instance holding the embedded page templates
pub struct PageRenderer {
    tera: Tera,
}

impl PageRenderer {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES)?;
        Ok(Self { tera })
    }

    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String, ApiError> {
        self.tera.render(template, context).map_err(|e| {
            tracing::error!(template, error = ?e, "Failed to render page");
            ApiError::internal_error("Internal server error")
        })
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(LOGIN_PATH, get(login_page))
        .route("/register", get(register_page))
        .route("/dashboard", get(dashboard_page))
}

fn credentials_form(
    state: &AppState,
    mode: &str,
    heading: &str,
    action: &str,
    next: &str,
) -> Result<Html<String>, ApiError> {
    let mut context = TeraContext::new();
    context.insert("mode", mode);
    context.insert("heading", heading);
    context.insert("action", action);
    context.insert("next", next);
    state.pages.render("login.html", &context).map(Html)
}

async fn login_page(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    credentials_form(&state, "login", "Log in", "/api/auth/login", "/dashboard")
}

async fn register_page(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    credentials_form(&state, "register", "Register", "/api/auth/register", LOGIN_PATH)
}

async fn dashboard_page(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state.ledger_service.summary(user.id).await?;

    let mut context = TeraContext::new();
    context.insert("email", &user.email);
    context.insert("summary", &summary);
    state.pages.render("dashboard.html", &context).map(Html)
}

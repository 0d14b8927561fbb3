//! Ledgerline - Freelancer bookkeeping with stateless signed sessions

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledgerline::{
    api::{self, AppState},
    auth::{SessionAuthority, SystemClock},
    config::Config,
    db,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledgerline=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Ledgerline...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Refuse to start without a usable signing key
    let signing_key = config
        .auth
        .signing_key()
        .context("Session signing secret is not configured correctly")?;
    let authority = SessionAuthority::with_options(
        &signing_key,
        config.auth.algorithm,
        config
            .auth
            .ttl()
            .context("Invalid auth.token_ttl_seconds")?,
        config
            .auth
            .leeway()
            .context("Invalid auth.leeway_seconds")?,
        Arc::new(SystemClock),
    )
    .context("Failed to initialize session authority")?;
    tracing::info!(
        algorithm = %authority.algorithm(),
        ttl_seconds = authority.ttl().num_seconds(),
        "Session authority ready"
    );

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {}", config.database.url);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, pool, authority)?;

    // Start rate limiter cleanup task (runs every 5 minutes)
    {
        let limiter = state.rate_limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(300));
            loop {
                interval.tick().await;
                limiter.cleanup().await;
            }
        });
    }

    // Build router
    let app = api::build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

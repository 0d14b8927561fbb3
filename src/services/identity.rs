//! Identity service
//!
//! Registration and credential checks against the user store:
//! - `register` stores a new account with an Argon2id hash and issues no session
//! - `authenticate` checks email and password and returns the user; the caller
//!   mints the session token
//!
//! Unknown emails and wrong passwords fail with the same error so that
//! responses don't reveal which accounts exist.

use crate::db::repositories::{is_unique_violation, UserRepository};
use crate::models::User;
use crate::services::password::{hash_password, verify_password};
use crate::services::rate_limiter::LoginRateLimiter;
use anyhow::Context;
use std::sync::{Arc, OnceLock};

#[derive(Debug, thiserror::Error)]
pub enum IdentityServiceError {
    /// Missing or blank credentials
    #[error("Email and password are required.")]
    MissingCredentials,

    #[error("Email already in use.")]
    EmailTaken,

    /// Unknown email or wrong password
    #[error("Invalid credentials.")]
    InvalidCredentials,

    /// Too many recent failures for this email
    #[error("Too many failed login attempts. Please try again later.")]
    RateLimited,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Credentials submitted to register or log in
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Build from optional request fields, rejecting missing or blank ones
    pub fn from_parts(
        email: Option<String>,
        password: Option<String>,
    ) -> Result<Self, IdentityServiceError> {
        match (email, password) {
            (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
                Ok(Self::new(email, password))
            }
            _ => Err(IdentityServiceError::MissingCredentials),
        }
    }

    fn validated(self) -> Result<Self, IdentityServiceError> {
        Self::from_parts(Some(self.email), Some(self.password))
    }
}

/// Hash checked when the email is unknown, so both failure paths pay for Argon2
fn dummy_password_hash() -> &'static str {
    static DUMMY_HASH: OnceLock<String> = OnceLock::new();
    DUMMY_HASH.get_or_init(|| {
        hash_password("ledgerline-unknown-account").unwrap_or_else(|e| {
            tracing::error!(error = ?e, "Failed to build placeholder password hash");
            String::new()
        })
    })
}

/// Emails are stored and looked up trimmed and lowercased
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct IdentityService {
    user_repo: Arc<dyn UserRepository>,
    rate_limiter: Arc<LoginRateLimiter>,
}

impl IdentityService {
    pub fn new(user_repo: Arc<dyn UserRepository>, rate_limiter: Arc<LoginRateLimiter>) -> Self {
        Self {
            user_repo,
            rate_limiter,
        }
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// - `MissingCredentials` if email or password is blank
    /// - `EmailTaken` if the email is already registered
    pub async fn register(&self, credentials: Credentials) -> Result<User, IdentityServiceError> {
        let Credentials { email, password } = credentials.validated()?;
        let email = normalize_email(&email);

        if self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(IdentityServiceError::EmailTaken);
        }

        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .context("Password hashing task failed")??;

        match self.user_repo.create(&User::new(email, password_hash)).await {
            Ok(user) => {
                tracing::info!(user_id = user.id, "Registered new user");
                Ok(user)
            }
            // Lost a race with a concurrent registration of the same email
            Err(e) if is_unique_violation(&e) => Err(IdentityServiceError::EmailTaken),
            Err(e) => Err(e.context("Failed to create user").into()),
        }
    }

    /// Check credentials and return the matching user.
    ///
    /// The rate limit is checked before the password so a throttled email gets
    /// the same answer whether or not the password is right. Unknown emails
    /// are verified against a placeholder hash so both failures cost the same.
    pub async fn authenticate(
        &self,
        credentials: Credentials,
    ) -> Result<User, IdentityServiceError> {
        let Credentials { email, password } = credentials.validated()?;
        let email = normalize_email(&email);

        if !self.rate_limiter.try_begin_attempt(&email).await {
            tracing::warn!("Login rate limit hit");
            return Err(IdentityServiceError::RateLimited);
        }

        let user = self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to look up user")?;

        let hash = match &user {
            Some(user) => user.password_hash.clone(),
            None => dummy_password_hash().to_string(),
        };
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .context("Password verification task failed")?;

        let Some(user) = user else {
            return Err(IdentityServiceError::InvalidCredentials);
        };
        if !verified.context("Failed to verify password")? {
            return Err(IdentityServiceError::InvalidCredentials);
        }

        self.rate_limiter.clear(&email).await;
        Ok(user)
    }

    /// Load a user by id
    pub async fn get_user(&self, id: i64) -> Result<Option<User>, IdentityServiceError> {
        Ok(self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user")?)
    }
}

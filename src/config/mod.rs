//! Configuration management
//!
//! This module handles loading and parsing configuration for the Ledgerline service.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults. The session
//! signing secret has no default: startup fails when it is absent.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::auth::{
    expiry_leeway, token_lifetime, Algorithm, ConfigurationError, SigningKey,
    DEFAULT_TOKEN_TTL_SECONDS,
};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Session authority configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Request gate rules
    #[serde(default)]
    pub gate: GateConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (for cookie-based auth)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL or file path
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/ledgerline.db".to_string()
}

/// Session authority configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC signing secret. Never serialized back out.
    #[serde(default, skip_serializing)]
    pub secret: Option<String>,
    /// Token lifetime in seconds
    #[serde(default = "default_token_ttl")]
    pub token_ttl_seconds: i64,
    /// Signature algorithm
    #[serde(default)]
    pub algorithm: Algorithm,
    /// Accepted clock skew past expiry, in seconds
    #[serde(default)]
    pub leeway_seconds: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: None,
            token_ttl_seconds: default_token_ttl(),
            algorithm: Algorithm::default(),
            leeway_seconds: 0,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field("algorithm", &self.algorithm)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

fn default_token_ttl() -> i64 {
    DEFAULT_TOKEN_TTL_SECONDS
}

impl AuthConfig {
    /// Build the signing key, failing closed when the secret is absent or weak
    pub fn signing_key(&self) -> Result<SigningKey, ConfigurationError> {
        match self.secret.as_deref() {
            Some(secret) => SigningKey::new(secret),
            None => Err(ConfigurationError::MissingSecret),
        }
    }

    /// Token lifetime; fails when `token_ttl_seconds` is out of range
    pub fn ttl(&self) -> Result<Duration, ConfigurationError> {
        token_lifetime(self.token_ttl_seconds)
    }

    /// Expiry leeway; fails when `leeway_seconds` is out of range
    pub fn leeway(&self) -> Result<Duration, ConfigurationError> {
        expiry_leeway(self.leeway_seconds)
    }
}

/// What a path requires before the request reaches a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PathAccess {
    /// Admitted without credentials
    #[default]
    Public,
    /// Browser page; denial redirects to the login page
    Page,
    /// JSON API; denial is a 401 error body
    Api,
}

/// A path prefix and the access it requires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
    pub prefix: String,
    pub access: PathAccess,
}

impl RouteRule {
    pub fn new(prefix: impl Into<String>, access: PathAccess) -> Self {
        Self {
            prefix: prefix.into(),
            access,
        }
    }
}

/// Request gate configuration.
///
/// Rules are evaluated in order and the first match wins. A path no rule
/// matches gets `fallback`, which defaults to `Public`: a new page or API
/// route outside `/dashboard` and `/api` is reachable without a session
/// until a rule for its prefix is added (or `fallback` is set to `page`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default = "default_gate_rules")]
    pub rules: Vec<RouteRule>,
    /// Access applied to paths no rule matches
    #[serde(default)]
    pub fallback: PathAccess,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            rules: default_gate_rules(),
            fallback: PathAccess::default(),
        }
    }
}

fn default_gate_rules() -> Vec<RouteRule> {
    vec![
        RouteRule::new("/login", PathAccess::Public),
        RouteRule::new("/register", PathAccess::Public),
        RouteRule::new("/api/auth/login", PathAccess::Public),
        RouteRule::new("/api/auth/register", PathAccess::Public),
        RouteRule::new("/api/auth/logout", PathAccess::Public),
        RouteRule::new("/dashboard", PathAccess::Page),
        RouteRule::new("/api", PathAccess::Api),
    ]
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - LEDGERLINE_SERVER_HOST
    /// - LEDGERLINE_SERVER_PORT
    /// - LEDGERLINE_SERVER_CORS_ORIGIN
    /// - LEDGERLINE_DATABASE_URL
    /// - LEDGERLINE_AUTH_SECRET (falls back to JWT_SECRET)
    /// - LEDGERLINE_AUTH_TOKEN_TTL_SECONDS
    /// - LEDGERLINE_AUTH_ALGORITHM
    /// - LEDGERLINE_AUTH_LEEWAY_SECONDS
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        // Server configuration
        if let Ok(host) = std::env::var("LEDGERLINE_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("LEDGERLINE_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("LEDGERLINE_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        // Database configuration
        if let Ok(url) = std::env::var("LEDGERLINE_DATABASE_URL") {
            self.database.url = url;
        }

        // Auth configuration
        if let Ok(secret) =
            std::env::var("LEDGERLINE_AUTH_SECRET").or_else(|_| std::env::var("JWT_SECRET"))
        {
            self.auth.secret = Some(secret);
        }
        if let Ok(ttl) = std::env::var("LEDGERLINE_AUTH_TOKEN_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<i64>() {
                if ttl > 0 {
                    self.auth.token_ttl_seconds = ttl;
                }
            }
        }
        if let Ok(algorithm) = std::env::var("LEDGERLINE_AUTH_ALGORITHM") {
            if let Ok(algorithm) = algorithm.parse::<Algorithm>() {
                self.auth.algorithm = algorithm;
            }
        }
        if let Ok(leeway) = std::env::var("LEDGERLINE_AUTH_LEEWAY_SECONDS") {
            if let Ok(leeway) = leeway.parse::<i64>() {
                if leeway >= 0 {
                    self.auth.leeway_seconds = leeway;
                }
            }
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for all config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_KEYS: &[&str] = &[
    "LEDGERLINE_SERVER_HOST",
    "LEDGERLINE_SERVER_PORT",
    "LEDGERLINE_SERVER_CORS_ORIGIN",
    "LEDGERLINE_DATABASE_URL",
    "LEDGERLINE_AUTH_SECRET",
    "JWT_SECRET",
    "LEDGERLINE_AUTH_TOKEN_TTL_SECONDS",
    "LEDGERLINE_AUTH_ALGORITHM",
    "LEDGERLINE_AUTH_LEEWAY_SECONDS",
];

#[cfg(test)]
fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

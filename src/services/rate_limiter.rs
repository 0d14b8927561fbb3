//! Rate limiter for login attempts
//!
//! Limits failed logins per email address (5 failures per 15 minutes by
//! default). Counters live in memory and are pruned periodically.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Failed attempts allowed inside one window
pub const DEFAULT_MAX_FAILURES: usize = 5;
/// Sliding window length in minutes
pub const DEFAULT_WINDOW_MINUTES: i64 = 15;

/// Login rate limiter
pub struct LoginRateLimiter {
    /// Failed login attempts by normalized email
    attempts: Arc<RwLock<HashMap<String, Vec<DateTime<Utc>>>>>,
    max_failures: usize,
    window: Duration,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self::with_limits(
            DEFAULT_MAX_FAILURES,
            Duration::minutes(DEFAULT_WINDOW_MINUTES),
        )
    }

    pub fn with_limits(max_failures: usize, window: Duration) -> Self {
        Self {
            attempts: Arc::new(RwLock::new(HashMap::new())),
            max_failures,
            window,
        }
    }

    fn key(email: &str) -> String {
        email.trim().to_lowercase()
    }

    /// Claim one attempt for this email.
    ///
    /// Returns `false` when the window's failures are used up. Otherwise the
    /// attempt is counted as a failure until `clear` is called, so the check
    /// and the count happen under one write guard and concurrent logins
    /// cannot overshoot the cap.
    pub async fn try_begin_attempt(&self, email: &str) -> bool {
        let mut attempts = self.attempts.write().await;
        let now = Utc::now();
        let cutoff = now - self.window;

        let times = attempts.entry(Self::key(email)).or_default();
        times.retain(|time| *time > cutoff);
        if times.len() >= self.max_failures {
            return false;
        }
        times.push(now);
        true
    }

    /// Clear failed attempts (on successful login)
    pub async fn clear(&self, email: &str) {
        self.attempts.write().await.remove(&Self::key(email));
    }

    /// Drop expired attempts and empty entries (called periodically)
    pub async fn cleanup(&self) {
        let cutoff = Utc::now() - self.window;
        let mut attempts = self.attempts.write().await;
        attempts.retain(|_, times| {
            times.retain(|time| *time > cutoff);
            !times.is_empty()
        });
    }

    /// Number of emails currently tracked
    pub async fn tracked(&self) -> usize {
        self.attempts.read().await.len()
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

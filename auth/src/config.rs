//! Authentication configuration.
//!
//! Values come from the application (builder methods) or from the
//! environment via [`AuthConfig::from_env`]. Defaults reproduce the
//! production policy: 15 minute links, 30 day sessions, 5 link requests per
//! hour per email.

use chrono::Duration;
use std::env;
use std::fmt;

/// Secret used when `AUTH_JWT_SECRET` is not set. Development only.
pub const DEV_JWT_SECRET: &str = "your-secret-key-change-in-production";

/// Longest duration accepted from the environment.
pub const MAX_TTL: Duration = Duration::days(36_500);

/// Magic-link authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// Symmetric secret for signing session credentials.
    pub jwt_secret: String,

    /// Base of the rendered link; the token is appended as `?token=`.
    ///
    /// Default: `onboardingapp://auth/verify` (mobile deep link)
    pub link_base_url: String,

    /// Magic link time-to-live.
    ///
    /// Default: 15 minutes
    pub link_ttl: Duration,

    /// Session credential lifetime.
    ///
    /// Default: 30 days
    pub session_ttl: Duration,

    /// Token bucket capacity per email.
    ///
    /// Default: 5
    pub rate_limit_capacity: u32,

    /// Time to replenish one token.
    ///
    /// Default: 12 minutes
    pub rate_limit_refill: Duration,

    /// Bound of the notification queue.
    ///
    /// Default: 256
    pub notification_queue_capacity: usize,
}

impl AuthConfig {
    /// Create configuration with the given signing secret and default policy.
    #[must_use]
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Unset or unparseable variables fall back to defaults, as do durations
    /// that are not positive or exceed [`MAX_TTL`]. A missing
    /// `AUTH_JWT_SECRET` falls back to [`DEV_JWT_SECRET`] with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let jwt_secret = env::var("AUTH_JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("AUTH_JWT_SECRET not set, using development secret");
            DEV_JWT_SECRET.to_string()
        });

        Self {
            jwt_secret,
            link_base_url: env::var("AUTH_LINK_BASE_URL").unwrap_or(defaults.link_base_url),
            link_ttl: env_ttl("AUTH_LINK_TTL_MINUTES", Duration::try_minutes)
                .unwrap_or(defaults.link_ttl),
            session_ttl: env_ttl("AUTH_SESSION_TTL_DAYS", Duration::try_days)
                .unwrap_or(defaults.session_ttl),
            rate_limit_capacity: env_parse("AUTH_RATE_LIMIT_CAPACITY")
                .unwrap_or(defaults.rate_limit_capacity),
            rate_limit_refill: env_ttl("AUTH_RATE_LIMIT_REFILL_MINUTES", Duration::try_minutes)
                .unwrap_or(defaults.rate_limit_refill),
            notification_queue_capacity: env_parse("AUTH_NOTIFICATION_QUEUE")
                .unwrap_or(defaults.notification_queue_capacity),
        }
    }

    /// Set the link base URL.
    #[must_use]
    pub fn with_link_base_url(mut self, url: impl Into<String>) -> Self {
        self.link_base_url = url.into();
        self
    }

    /// Set link time-to-live.
    #[must_use]
    pub const fn with_link_ttl(mut self, ttl: Duration) -> Self {
        self.link_ttl = ttl;
        self
    }

    /// Set session duration.
    #[must_use]
    pub const fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Set the rate limit policy.
    #[must_use]
    pub const fn with_rate_limit(mut self, capacity: u32, refill: Duration) -> Self {
        self.rate_limit_capacity = capacity;
        self.rate_limit_refill = refill;
        self
    }

    /// Set notification queue bound.
    #[must_use]
    pub const fn with_notification_queue_capacity(mut self, capacity: usize) -> Self {
        self.notification_queue_capacity = capacity;
        self
    }

    /// Render the link URL for a token.
    #[must_use]
    pub fn link_url(&self, token: &str) -> String {
        format!("{}?token={token}", self.link_base_url)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            link_base_url: "onboardingapp://auth/verify".to_string(),
            link_ttl: Duration::minutes(15),
            session_ttl: Duration::days(30),
            rate_limit_capacity: 5,
            rate_limit_refill: Duration::minutes(12),
            notification_queue_capacity: 256,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("link_base_url", &self.link_base_url)
            .field("link_ttl", &self.link_ttl)
            .field("session_ttl", &self.session_ttl)
            .field("rate_limit_capacity", &self.rate_limit_capacity)
            .field("rate_limit_refill", &self.rate_limit_refill)
            .field("notification_queue_capacity", &self.notification_queue_capacity)
            .finish()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    parse_value(key, &env::var(key).ok()?)
}

fn env_ttl(key: &str, unit: fn(i64) -> Option<Duration>) -> Option<Duration> {
    parse_ttl(key, &env::var(key).ok()?, unit)
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Option<T> {
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key = %key, value = %raw, "Ignoring unparseable configuration value");
            None
        }
    }
}

fn parse_ttl(key: &str, raw: &str, unit: fn(i64) -> Option<Duration>) -> Option<Duration> {
    let amount = parse_value::<i64>(key, raw)?;
    match unit(amount) {
        Some(ttl) if ttl > Duration::zero() && ttl <= MAX_TTL => Some(ttl),
        _ => {
            tracing::warn!(key = %key, value = %raw, "Ignoring out-of-range duration");
            None
        }
    }
}

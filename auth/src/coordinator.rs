//! Magic-link authentication flows.
//!
//! [`AuthCoordinator`] composes the four stateful components into the three
//! public flows:
//!
//! ```text
//! request_link:  RateLimiter.allow → TokenStore.create → dispatch notification
//! verify_link:   TokenStore.consume → UserDirectory.get_or_create → SessionCodec.sign
//! refresh_token: SessionCodec.verify → SessionCodec.sign
//! ```
//!
//! Components never call each other and no lock is held across an `.await`,
//! so the coordinator itself needs no synchronization.

use crate::clock::SharedClock;
use crate::config::AuthConfig;
use crate::dispatcher::{NotificationDispatcher, NotificationJob};
use crate::error::{AuthError, ConsumeError, Result};
use crate::message::render_magic_link;
use crate::providers::NotificationSender;
use crate::session::{SessionClaims, SessionCodec};
use crate::stores::{RateLimiter, TokenStore, UserDirectory};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Shortest period accepted by [`AuthCoordinator::spawn_maintenance`].
pub const MIN_MAINTENANCE_INTERVAL: std::time::Duration = std::time::Duration::from_millis(1);

/// Result of a successful [`AuthCoordinator::request_link`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedLink {
    /// Opaque single-use token (64 lowercase hex characters).
    pub token: String,

    /// Rendered link sent to the user.
    pub url: String,

    /// When the link stops working.
    pub expires_at: DateTime<Utc>,
}

/// Result of a successful [`AuthCoordinator::verify_link`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Session credential.
    pub token: String,

    /// User identity.
    pub user_id: String,

    /// User email.
    pub email: String,

    /// `true` if this verification created the identity.
    pub is_new_user: bool,
}

/// Result of a successful [`AuthCoordinator::refresh_token`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// New session credential.
    pub token: String,

    /// User identity.
    pub user_id: String,

    /// User email.
    pub email: String,
}

/// Identity carried by a valid session credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// User identity.
    pub user_id: String,

    /// User email.
    pub email: String,
}

/// Orchestrates rate limiting, magic links, identities and sessions.
#[derive(Debug)]
pub struct AuthCoordinator {
    config: AuthConfig,
    rate_limiter: RateLimiter,
    tokens: TokenStore,
    users: UserDirectory,
    sessions: SessionCodec,
    dispatcher: NotificationDispatcher,
}

impl AuthCoordinator {
    /// Build a coordinator and its components from `config`.
    ///
    /// Starts the notification worker, so this must be called from within a
    /// Tokio runtime.
    #[must_use]
    pub fn new<N>(config: AuthConfig, notifier: Arc<N>, clock: SharedClock) -> Self
    where
        N: NotificationSender + 'static,
    {
        let rate_limiter = RateLimiter::new(
            config.rate_limit_capacity,
            config.rate_limit_refill,
            Arc::clone(&clock),
        );
        let tokens = TokenStore::new(config.link_ttl, Arc::clone(&clock));
        let users = UserDirectory::new(Arc::clone(&clock));
        let sessions = SessionCodec::new(config.jwt_secret.as_bytes(), config.session_ttl, clock);
        let dispatcher =
            NotificationDispatcher::spawn(notifier, config.notification_queue_capacity);

        Self::from_parts(config, rate_limiter, tokens, users, sessions, dispatcher)
    }

    /// Assemble a coordinator from components built by the caller.
    #[must_use]
    pub const fn from_parts(
        config: AuthConfig,
        rate_limiter: RateLimiter,
        tokens: TokenStore,
        users: UserDirectory,
        sessions: SessionCodec,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            config,
            rate_limiter,
            tokens,
            users,
            sessions,
            dispatcher,
        }
    }

    /// Issue a magic link for `email` and queue its delivery.
    ///
    /// Delivery happens in the background; its outcome never affects the
    /// result.
    ///
    /// # Errors
    ///
    /// - `AuthError::RateLimitExceeded` if `email` has no request budget left
    /// - `AuthError::InternalError` if the token cannot be generated
    pub fn request_link(&self, email: &str) -> Result<IssuedLink> {
        if !self.rate_limiter.allow(email) {
            warn!(email = %email, "Magic link request rate limited");
            return Err(AuthError::RateLimitExceeded);
        }

        let link = self.tokens.create(email)?;
        let url = self.config.link_url(&link.token);
        let message = render_magic_link(&url, self.config.link_ttl);

        let queued = self.dispatcher.dispatch(NotificationJob {
            destination: email.to_string(),
            message,
        });
        info!(email = %email, queued, expires_at = %link.expires_at, "Magic link issued");

        Ok(IssuedLink {
            token: link.token,
            url,
            expires_at: link.expires_at,
        })
    }

    /// Redeem a magic link and open a session.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidOrExpired` if the token is unknown or expired
    /// - `AuthError::AlreadyUsed` if the token was already redeemed
    /// - `AuthError::InternalError` on lock or signing failure
    pub fn verify_link(&self, token: &str) -> Result<AuthResponse> {
        let email = self.tokens.consume(token).map_err(|reason| {
            match reason {
                ConsumeError::AlreadyUsed => warn!("Magic link replay rejected"),
                _ => debug!(reason = %reason, "Magic link rejected"),
            }
            AuthError::from(reason)
        })?;

        let enrollment = self.users.get_or_create(&email)?;
        let session = self.sessions.sign(&enrollment.user.id, &enrollment.user.email)?;

        info!(
            user_id = %enrollment.user.id,
            email = %email,
            is_new_user = enrollment.is_new,
            "Magic link verified"
        );

        Ok(AuthResponse {
            token: session.token,
            user_id: enrollment.user.id,
            email: enrollment.user.email,
            is_new_user: enrollment.is_new,
        })
    }

    /// Exchange a valid credential for one with a fresh expiry.
    ///
    /// The identity is taken from the credential as-is; the user directory is
    /// not consulted.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidCredential` if the credential does not verify
    /// - `AuthError::InternalError` if signing fails
    pub fn refresh_token(&self, credential: &str) -> Result<RefreshResponse> {
        let claims = self.verified_claims(credential)?;
        let session = self.sessions.sign_with_min_expiry(
            &claims.user_id,
            &claims.email,
            claims.exp.saturating_add(1),
        )?;

        debug!(user_id = %claims.user_id, exp = session.claims.exp, "Session refreshed");

        Ok(RefreshResponse {
            token: session.token,
            user_id: claims.user_id,
            email: claims.email,
        })
    }

    /// Return the identity carried by a credential.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredential` if the credential is malformed,
    /// forged or expired.
    pub fn validate_credential(&self, credential: &str) -> Result<Identity> {
        let claims = self.verified_claims(credential)?;

        Ok(Identity {
            user_id: claims.user_id,
            email: claims.email,
        })
    }

    fn verified_claims(&self, credential: &str) -> Result<SessionClaims> {
        self.sessions.verify(credential).map_err(|reason| {
            debug!(reason = %reason, "Credential rejected");
            AuthError::from(reason)
        })
    }

    /// Like [`validate_credential`](Self::validate_credential), for an
    /// `Authorization` header value with an optional `Bearer ` prefix.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredential` if the credential does not
    /// verify.
    pub fn validate_bearer(&self, header: &str) -> Result<Identity> {
        let credential = header.strip_prefix("Bearer ").unwrap_or(header);
        self.validate_credential(credential.trim())
    }

    /// Sweep expired links and idle rate-limit buckets every `interval`.
    ///
    /// The task holds a weak reference and stops once the coordinator is
    /// dropped. Sweeping only reclaims memory; expiry is always enforced at
    /// access time. Intervals shorter than [`MIN_MAINTENANCE_INTERVAL`] are
    /// raised to it.
    pub fn spawn_maintenance(self: &Arc<Self>, interval: std::time::Duration) -> JoinHandle<()> {
        let coordinator = Arc::downgrade(self);
        let interval = if interval < MIN_MAINTENANCE_INTERVAL {
            warn!(
                requested_ms = interval.as_millis(),
                "Maintenance interval too short, using minimum"
            );
            MIN_MAINTENANCE_INTERVAL
        } else {
            interval
        };

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(coordinator) = coordinator.upgrade() else {
                    debug!("Coordinator dropped, stopping maintenance");
                    break;
                };
                coordinator.sweep();
            }
        })
    }

    /// Run one maintenance pass. Returns `(links_removed, buckets_removed)`.
    pub fn sweep(&self) -> (usize, usize) {
        let links = self.tokens.purge_expired().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to purge expired magic links");
            0
        });
        let buckets = self.rate_limiter.purge_idle().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to purge idle rate limit buckets");
            0
        });

        if links > 0 || buckets > 0 {
            debug!(links, buckets, "Maintenance sweep");
        }
        (links, buckets)
    }

    /// Stop accepting notifications and wait for queued ones to finish.
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Rate limiter.
    #[must_use]
    pub const fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Magic link store.
    #[must_use]
    pub const fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// User directory.
    #[must_use]
    pub const fn users(&self) -> &UserDirectory {
        &self.users
    }

    /// Notification dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::Clock;
    use crate::mocks::{FailingRng, ManualClock, RecordingNotifier};
    use chrono::Duration;

    fn coordinator() -> (AuthCoordinator, Arc<ManualClock>, Arc<RecordingNotifier>) {
        let clock = Arc::new(ManualClock::default());
        let notifier = Arc::new(RecordingNotifier::new());
        let coordinator = AuthCoordinator::new(
            AuthConfig::new("test-secret"),
            Arc::clone(&notifier),
            clock.clone(),
        );
        (coordinator, clock, notifier)
    }

    #[tokio::test]
    async fn test_request_link_renders_url_and_notifies() {
        let (coordinator, clock, notifier) = coordinator();

        let issued = coordinator.request_link("alice@example.com").unwrap();
        assert_eq!(
            issued.url,
            format!("onboardingapp://auth/verify?token={}", issued.token)
        );
        assert_eq!(issued.expires_at, clock.now() + Duration::minutes(15));

        coordinator.shutdown().await;
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "alice@example.com");
        assert_eq!(sent[0].1.link, issued.url);
    }

    #[tokio::test]
    async fn test_verify_then_validate() {
        let (coordinator, _clock, _notifier) = coordinator();

        let issued = coordinator.request_link("bob@example.com").unwrap();
        let auth = coordinator.verify_link(&issued.token).unwrap();
        assert!(auth.is_new_user);
        assert_eq!(auth.email, "bob@example.com");

        let identity = coordinator.validate_credential(&auth.token).unwrap();
        assert_eq!(identity.user_id, auth.user_id);
        assert_eq!(identity.email, auth.email);
    }

    #[tokio::test]
    async fn test_verify_accepts_uppercase_token() {
        let (coordinator, _clock, _notifier) = coordinator();

        let issued = coordinator.request_link("case@example.com").unwrap();
        let auth = coordinator.verify_link(&issued.token.to_uppercase()).unwrap();
        assert_eq!(auth.email, "case@example.com");
    }

    #[tokio::test]
    async fn test_validate_bearer_strips_prefix() {
        let (coordinator, _clock, _notifier) = coordinator();

        let issued = coordinator.request_link("carol@example.com").unwrap();
        let auth = coordinator.verify_link(&issued.token).unwrap();

        let with_prefix = coordinator
            .validate_bearer(&format!("Bearer {}", auth.token))
            .unwrap();
        let without_prefix = coordinator.validate_bearer(&auth.token).unwrap();
        assert_eq!(with_prefix, without_prefix);

        assert_eq!(
            coordinator.validate_bearer("Bearer "),
            Err(AuthError::InvalidCredential)
        );
    }

    #[tokio::test]
    async fn test_unknown_token_is_invalid_or_expired() {
        let (coordinator, _clock, _notifier) = coordinator();

        assert_eq!(
            coordinator.verify_link(&"0".repeat(64)),
            Err(AuthError::InvalidOrExpired)
        );
    }

    #[tokio::test]
    async fn test_expired_credential_is_rejected() {
        let (coordinator, clock, _notifier) = coordinator();

        let issued = coordinator.request_link("dave@example.com").unwrap();
        let auth = coordinator.verify_link(&issued.token).unwrap();

        clock.advance(Duration::days(30) + Duration::seconds(1));
        assert_eq!(
            coordinator.refresh_token(&auth.token),
            Err(AuthError::InvalidCredential)
        );
    }

    #[tokio::test]
    async fn test_sweep_purges_expired_links() {
        let (coordinator, clock, _notifier) = coordinator();

        coordinator.request_link("erin@example.com").unwrap();
        coordinator.request_link("frank@example.com").unwrap();
        assert_eq!(coordinator.tokens().len(), 2);

        clock.advance(Duration::minutes(16));
        let (links, _buckets) = coordinator.sweep();
        assert_eq!(links, 2);
        assert!(coordinator.tokens().is_empty());
    }

    #[tokio::test]
    async fn test_maintenance_stops_when_coordinator_dropped() {
        let (coordinator, _clock, _notifier) = coordinator();
        let coordinator = Arc::new(coordinator);

        let handle = coordinator.spawn_maintenance(std::time::Duration::from_millis(5));
        coordinator.shutdown().await;
        drop(coordinator);

        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_refresh_in_same_second_still_extends_expiry() {
        let (coordinator, clock, _notifier) = coordinator();
        let inspector = SessionCodec::new(b"test-secret", Duration::days(30), clock.clone());

        let issued = coordinator.request_link("grace@example.com").unwrap();
        let auth = coordinator.verify_link(&issued.token).unwrap();
        let refreshed = coordinator.refresh_token(&auth.token).unwrap();
        let again = coordinator.refresh_token(&refreshed.token).unwrap();

        let original = inspector.verify(&auth.token).unwrap();
        let renewed = inspector.verify(&refreshed.token).unwrap();
        let renewed_again = inspector.verify(&again.token).unwrap();
        assert!(renewed.exp > original.exp);
        assert!(renewed_again.exp > renewed.exp);
        assert_ne!(refreshed.token, auth.token);
    }

    #[tokio::test]
    async fn test_random_source_failure_is_internal_error() {
        let clock: SharedClock = Arc::new(ManualClock::default());
        let config = AuthConfig::new("test-secret");
        let coordinator = AuthCoordinator::from_parts(
            config.clone(),
            RateLimiter::new(5, Duration::minutes(12), Arc::clone(&clock)),
            TokenStore::with_rng(config.link_ttl, Arc::clone(&clock), FailingRng),
            UserDirectory::new(Arc::clone(&clock)),
            SessionCodec::new(b"test-secret", config.session_ttl, clock),
            NotificationDispatcher::spawn(Arc::new(RecordingNotifier::new()), 8),
        );

        assert!(matches!(
            coordinator.request_link("heidi@example.com"),
            Err(AuthError::InternalError(_))
        ));
        assert!(coordinator.tokens().is_empty());

        coordinator.shutdown().await;
        assert_eq!(coordinator.dispatcher().stats().delivered(), 0);
    }

    #[tokio::test]
    async fn test_unrepresentable_session_ttl_is_internal_error() {
        let clock = Arc::new(ManualClock::default());
        let config = AuthConfig::new("test-secret").with_session_ttl(Duration::days(100_000_000));
        let coordinator = AuthCoordinator::new(config, Arc::new(RecordingNotifier::new()), clock);

        let issued = coordinator.request_link("ivan@example.com").unwrap();
        assert!(matches!(
            coordinator.verify_link(&issued.token),
            Err(AuthError::InternalError(_))
        ));
    }

    #[tokio::test]
    async fn test_zero_maintenance_interval_still_sweeps() {
        let (coordinator, clock, _notifier) = coordinator();
        let coordinator = Arc::new(coordinator);

        coordinator.request_link("judy@example.com").unwrap();
        clock.advance(Duration::minutes(16));

        let handle = coordinator.spawn_maintenance(std::time::Duration::ZERO);
        for _ in 0..200 {
            if coordinator.tokens().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        assert!(coordinator.tokens().is_empty());
        assert!(!handle.is_finished());
        handle.abort();
    }

    #[test]
    fn test_auth_response_field_names() {
        let response = AuthResponse {
            token: "jwt".to_string(),
            user_id: "id".to_string(),
            email: "a@example.com".to_string(),
            is_new_user: true,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["is_new_user"], true);
        assert_eq!(json["user_id"], "id");
    }
}

//! Integration tests for the magic link authentication flow.

use chrono::Duration;
use magiclink_auth::mocks::{FailingNotifier, ManualClock, RecordingNotifier};
use magiclink_auth::{AuthConfig, AuthCoordinator, AuthError, Clock, SessionCodec};
use std::sync::Arc;

const SECRET: &str = "integration-test-secret";

/// Create a coordinator on a manual clock with a recording notifier.
fn create_test_coordinator() -> (AuthCoordinator, Arc<ManualClock>, Arc<RecordingNotifier>) {
    let clock = Arc::new(ManualClock::default());
    let notifier = Arc::new(RecordingNotifier::new());
    let coordinator =
        AuthCoordinator::new(AuthConfig::new(SECRET), Arc::clone(&notifier), clock.clone());
    (coordinator, clock, notifier)
}

#[tokio::test]
async fn test_full_flow_request_verify_refresh() {
    let (coordinator, clock, notifier) = create_test_coordinator();

    // Request
    let issued = coordinator
        .request_link("alice@example.com")
        .expect("request should succeed");
    assert_eq!(issued.token.len(), 64);
    assert!(issued.token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

    // Verify
    let auth = coordinator
        .verify_link(&issued.token)
        .expect("verify should succeed");
    assert_eq!(auth.email, "alice@example.com");
    assert!(auth.is_new_user);

    // Refresh later
    clock.advance(Duration::hours(1));
    let refreshed = coordinator
        .refresh_token(&auth.token)
        .expect("refresh should succeed");
    assert_eq!(refreshed.user_id, auth.user_id);
    assert_eq!(refreshed.email, auth.email);

    coordinator.shutdown().await;
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "alice@example.com");
    assert!(sent[0].1.text.contains(&issued.token));
    assert!(sent[0].1.html.contains(&issued.token));
}

#[tokio::test]
async fn test_rate_limit_five_per_window_then_refill() {
    let (coordinator, clock, _notifier) = create_test_coordinator();
    let email = "limited@example.com";

    for attempt in 1..=5 {
        assert!(
            coordinator.request_link(email).is_ok(),
            "request {attempt} should be allowed"
        );
    }

    assert_eq!(
        coordinator.request_link(email),
        Err(AuthError::RateLimitExceeded)
    );

    // Other identities have their own bucket
    assert!(coordinator.request_link("other@example.com").is_ok());

    // One refill interval restores exactly one request
    clock.advance(Duration::minutes(12));
    assert!(coordinator.request_link(email).is_ok());
    assert_eq!(
        coordinator.request_link(email),
        Err(AuthError::RateLimitExceeded)
    );
}

#[tokio::test]
async fn test_link_expires_after_fifteen_minutes() {
    let (coordinator, clock, _notifier) = create_test_coordinator();

    let fresh = coordinator.request_link("late@example.com").expect("request");
    let stale = coordinator.request_link("late@example.com").expect("request");

    clock.advance(Duration::minutes(15));
    assert!(
        coordinator.verify_link(&fresh.token).is_ok(),
        "link must still work at exactly its expiry"
    );

    clock.advance(Duration::seconds(1));
    assert_eq!(
        coordinator.verify_link(&stale.token),
        Err(AuthError::InvalidOrExpired)
    );

    // Expired links are evicted, so the next attempt looks unknown
    assert_eq!(
        coordinator.verify_link(&stale.token),
        Err(AuthError::InvalidOrExpired)
    );
}

#[tokio::test]
async fn test_is_new_user_only_on_first_verification() {
    let (coordinator, _clock, _notifier) = create_test_coordinator();

    let first = coordinator.request_link("bob@example.com").expect("request");
    let second = coordinator.request_link("bob@example.com").expect("request");

    let first = coordinator.verify_link(&first.token).expect("verify");
    let second = coordinator.verify_link(&second.token).expect("verify");

    assert!(first.is_new_user);
    assert!(!second.is_new_user);
    assert_eq!(first.user_id, second.user_id);
    assert_eq!(coordinator.users().len(), 1);
}

#[tokio::test]
async fn test_refresh_extends_expiry() {
    let (coordinator, clock, _notifier) = create_test_coordinator();
    let inspector = SessionCodec::new(SECRET.as_bytes(), Duration::days(30), clock.clone());

    let issued = coordinator.request_link("carol@example.com").expect("request");
    let auth = coordinator.verify_link(&issued.token).expect("verify");

    clock.advance(Duration::days(1));
    let refreshed = coordinator.refresh_token(&auth.token).expect("refresh");

    let original = inspector.verify(&auth.token).expect("original claims");
    let renewed = inspector.verify(&refreshed.token).expect("renewed claims");
    assert!(renewed.exp > original.exp);
    assert_eq!(renewed.exp, (clock.now() + Duration::days(30)).timestamp());
    assert_eq!(renewed.user_id, original.user_id);
    assert_eq!(renewed.email, original.email);
}

#[tokio::test]
async fn test_immediate_refresh_extends_expiry() {
    let (coordinator, clock, _notifier) = create_test_coordinator();
    let inspector = SessionCodec::new(SECRET.as_bytes(), Duration::days(30), clock.clone());

    let issued = coordinator.request_link("quick@example.com").expect("request");
    let auth = coordinator.verify_link(&issued.token).expect("verify");

    // No time passes between issuance and refresh
    let refreshed = coordinator.refresh_token(&auth.token).expect("refresh");

    let original = inspector.verify(&auth.token).expect("original claims");
    let renewed = inspector.verify(&refreshed.token).expect("renewed claims");
    assert!(renewed.exp > original.exp);
    assert_ne!(refreshed.token, auth.token);
    assert_eq!(refreshed.user_id, auth.user_id);
}

#[tokio::test]
async fn test_credential_rejected_after_thirty_days() {
    let (coordinator, clock, _notifier) = create_test_coordinator();

    let issued = coordinator.request_link("dave@example.com").expect("request");
    let auth = coordinator.verify_link(&issued.token).expect("verify");

    clock.advance(Duration::days(30));
    assert!(coordinator.validate_credential(&auth.token).is_ok());

    clock.advance(Duration::seconds(1));
    assert_eq!(
        coordinator.validate_credential(&auth.token),
        Err(AuthError::InvalidCredential)
    );
    assert_eq!(
        coordinator.refresh_token(&auth.token),
        Err(AuthError::InvalidCredential)
    );
}

#[tokio::test]
async fn test_failing_notifier_does_not_affect_request() {
    let clock = Arc::new(ManualClock::default());
    let coordinator = AuthCoordinator::new(
        AuthConfig::new(SECRET),
        Arc::new(FailingNotifier::new()),
        clock,
    );

    let issued = coordinator
        .request_link("eve@example.com")
        .expect("delivery failure must not fail the request");

    coordinator.shutdown().await;
    assert_eq!(coordinator.dispatcher().stats().failed(), 1);

    // The issued token still works
    let auth = coordinator.verify_link(&issued.token).expect("verify");
    assert_eq!(auth.email, "eve@example.com");
}

#[tokio::test]
async fn test_custom_link_base_url() {
    let clock = Arc::new(ManualClock::default());
    let config = AuthConfig::new(SECRET).with_link_base_url("https://app.example.com/verify");
    let coordinator = AuthCoordinator::new(config, Arc::new(RecordingNotifier::new()), clock);

    let issued = coordinator.request_link("frank@example.com").expect("request");
    assert_eq!(
        issued.url,
        format!("https://app.example.com/verify?token={}", issued.token)
    );
}

//! Magic-Link Authentication Demo
//!
//! Walks through the full passwordless flow in one process:
//! - Requests a magic link (logged by the console notifier)
//! - Redeems it for a session credential
//! - Shows that a replay is rejected
//! - Refreshes the session
//!
//! # Usage
//!
//! ```bash
//! # Optional: AUTH_JWT_SECRET, AUTH_LINK_BASE_URL, ... in .env
//! cargo run --bin magiclink-demo -- user@example.com
//! ```

use anyhow::Context;
use magiclink_auth::clock::system_clock;
use magiclink_auth::{AuthConfig, AuthCoordinator, AuthError, ConsoleNotifier};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,magiclink_auth=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let email = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demo@example.com".to_string());

    let config = AuthConfig::from_env();
    tracing::info!(?config, "Configuration loaded");

    let coordinator = Arc::new(AuthCoordinator::new(
        config,
        Arc::new(ConsoleNotifier::new()),
        system_clock(),
    ));
    let maintenance = coordinator.spawn_maintenance(std::time::Duration::from_secs(60));

    // 1. Request
    let issued = coordinator
        .request_link(&email)
        .context("requesting magic link")?;
    tracing::info!(url = %issued.url, expires_at = %issued.expires_at, "✓ Link issued");

    // 2. Verify
    let auth = coordinator
        .verify_link(&issued.token)
        .context("verifying magic link")?;
    tracing::info!(
        user_id = %auth.user_id,
        is_new_user = auth.is_new_user,
        "✓ Signed in"
    );
    println!("{}", serde_json::to_string_pretty(&auth)?);

    // 3. Replay
    match coordinator.verify_link(&issued.token) {
        Err(AuthError::AlreadyUsed) => tracing::info!("✓ Replay rejected"),
        other => anyhow::bail!("replay was not rejected: {other:?}"),
    }

    // 4. Refresh
    let refreshed = coordinator
        .refresh_token(&auth.token)
        .context("refreshing session")?;
    let identity = coordinator.validate_bearer(&format!("Bearer {}", refreshed.token))?;
    tracing::info!(user_id = %identity.user_id, "✓ Session refreshed");

    maintenance.abort();
    coordinator.shutdown().await;
    Ok(())
}

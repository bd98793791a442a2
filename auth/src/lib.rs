//! # Magic-Link Authentication
//!
//! Passwordless authentication for a mobile onboarding backend: a user asks
//! for a sign-in link, receives it out of band, and redeems it once for a
//! long-lived session credential.
//!
//! ## Components
//!
//! - [`RateLimiter`]: per-email token bucket gating link requests
//! - [`TokenStore`]: single-use, time-limited magic links
//! - [`UserDirectory`]: email to identity mapping, created on first login
//! - [`SessionCodec`]: stateless HS256 session credentials
//! - [`NotificationDispatcher`]: fire-and-forget delivery through a
//!   [`NotificationSender`]
//!
//! [`AuthCoordinator`] composes them into the public flows.
//!
//! ## Example
//!
//! ```rust,no_run
//! use magiclink_auth::{AuthConfig, AuthCoordinator, ConsoleNotifier};
//! use magiclink_auth::clock::system_clock;
//! use std::sync::Arc;
//!
//! # async fn example() -> magiclink_auth::Result<()> {
//! let coordinator = AuthCoordinator::new(
//!     AuthConfig::from_env(),
//!     Arc::new(ConsoleNotifier::new()),
//!     system_clock(),
//! );
//!
//! // 1. Request a link (delivered in the background)
//! let issued = coordinator.request_link("user@example.com")?;
//!
//! // 2. User taps the link
//! let auth = coordinator.verify_link(&issued.token)?;
//!
//! // 3. Later, extend the session
//! let refreshed = coordinator.refresh_token(&auth.token)?;
//! assert_eq!(refreshed.user_id, auth.user_id);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod providers;
pub mod session;
pub mod stores;

// Mocks for testing
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use clock::{Clock, SharedClock, SystemClock};
pub use config::AuthConfig;
pub use coordinator::{AuthCoordinator, AuthResponse, Identity, IssuedLink, RefreshResponse};
pub use dispatcher::{DispatchStats, NotificationDispatcher, NotificationJob};
pub use error::{AuthError, ConsumeError, CredentialError, Result};
pub use message::{RenderedMessage, render_magic_link};
pub use providers::{ConsoleNotifier, NotificationError, NotificationSender};
pub use session::{SessionClaims, SessionCodec, SignedSession};
pub use stores::{Enrollment, MagicLink, RateLimiter, TokenStore, User, UserDirectory};

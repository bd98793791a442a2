//! In-memory state owned by the authentication core.
//!
//! Each store guards its own map with its own lock and never calls another
//! store, so no lock ordering exists between them:
//!
//! - **Rate Limiter** - per-email token buckets
//! - **Token Store** - single-use magic links with atomic consumption
//! - **User Directory** - get-or-create identity registry

pub mod rate_limiter;
pub mod token_store;
pub mod user_directory;

// Re-exports
pub use rate_limiter::RateLimiter;
pub use token_store::{MagicLink, TokenStore, generate_token};
pub use user_directory::{Enrollment, User, UserDirectory};

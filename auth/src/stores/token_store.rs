//! Single-use magic link registry.
//!
//! # Security Requirements
//!
//! 1. **Unguessable**: tokens carry 256 bits from the OS random source
//! 2. **Atomicity**: `consume()` looks up, checks and marks under one write lock
//! 3. **Single-use**: a consumed link stays in the map flagged `used`, so every
//!    replay fails the same way
//! 4. **Expiration**: expired links are rejected and evicted on access

use crate::clock::SharedClock;
use crate::error::{AuthError, ConsumeError, Result};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, RwLock};

/// Random bytes per token (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Length of the hex-encoded token.
pub const TOKEN_LENGTH: usize = TOKEN_BYTES * 2;

/// A stored magic link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicLink {
    /// Lowercase hex token.
    pub token: String,

    /// Email the link was issued for.
    pub email: String,

    /// Creation time.
    pub created_at: DateTime<Utc>,

    /// Expiration time (`created_at` + TTL).
    pub expires_at: DateTime<Utc>,

    /// Set once the link has been consumed.
    pub used: bool,
}

impl MagicLink {
    /// Whether the link is past its expiry at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Random source used to mint tokens.
type TokenRng = Box<dyn RngCore + Send>;

/// In-memory token registry with atomic single-use consumption.
pub struct TokenStore {
    links: RwLock<HashMap<String, MagicLink>>,
    rng: Mutex<TokenRng>,
    ttl: Duration,
    clock: SharedClock,
}

impl TokenStore {
    /// Create a store issuing links valid for `ttl`, drawing tokens from the
    /// OS random source.
    #[must_use]
    pub fn new(ttl: Duration, clock: SharedClock) -> Self {
        Self::with_rng(ttl, clock, OsRng)
    }

    /// Create a store drawing tokens from `rng`.
    #[must_use]
    pub fn with_rng<R>(ttl: Duration, clock: SharedClock, rng: R) -> Self
    where
        R: RngCore + CryptoRng + Send + 'static,
    {
        Self {
            links: RwLock::new(HashMap::new()),
            rng: Mutex::new(Box::new(rng)),
            ttl,
            clock,
        }
    }

    /// Issue a new link for `email` and return it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InternalError` if the random source fails, the
    /// expiry is not representable or a lock is poisoned. No link is stored
    /// in that case.
    pub fn create(&self, email: &str) -> Result<MagicLink> {
        let token = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| AuthError::InternalError("Token source lock poisoned".into()))?;
            generate_token_with(&mut **rng)?
        };

        let now = self.clock.now();
        let expires_at = now.checked_add_signed(self.ttl).ok_or_else(|| {
            AuthError::InternalError(format!("Magic link TTL {} overflows", self.ttl))
        })?;

        let link = MagicLink {
            token: token.clone(),
            email: email.to_string(),
            created_at: now,
            expires_at,
            used: false,
        };

        self.links
            .write()
            .map_err(|_| AuthError::InternalError("Token store lock poisoned".into()))?
            .insert(token, link.clone());

        tracing::debug!(email = %email, expires_at = %link.expires_at, "Magic link stored");
        Ok(link)
    }

    /// Consume a token atomically and return the owning email.
    ///
    /// Tokens are matched case-insensitively.
    ///
    /// # Errors
    ///
    /// - `ConsumeError::NotFound` if the token is unknown
    /// - `ConsumeError::Expired` if the link expired; it is evicted
    /// - `ConsumeError::AlreadyUsed` if the link was consumed before; it is kept
    /// - `ConsumeError::Unavailable` if the lock is poisoned
    pub fn consume(&self, token: &str) -> std::result::Result<String, ConsumeError> {
        let key = token.to_ascii_lowercase();
        let now = self.clock.now();

        let Ok(mut links) = self.links.write() else {
            tracing::error!("Token store lock poisoned, rejecting token");
            return Err(ConsumeError::Unavailable);
        };

        let Some(link) = links.get_mut(&key) else {
            return Err(ConsumeError::NotFound);
        };

        if link.is_expired_at(now) {
            links.remove(&key);
            return Err(ConsumeError::Expired);
        }

        if link.used {
            return Err(ConsumeError::AlreadyUsed);
        }

        link.used = true;
        Ok(link.email.clone())
    }

    /// Remove every expired link, used or not. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InternalError` if the lock is poisoned.
    pub fn purge_expired(&self) -> Result<usize> {
        let now = self.clock.now();
        let mut links = self
            .links
            .write()
            .map_err(|_| AuthError::InternalError("Token store lock poisoned".into()))?;

        let before = links.len();
        links.retain(|_, link| !link.is_expired_at(now));
        Ok(before - links.len())
    }

    /// Look up a link without consuming it.
    #[must_use]
    pub fn get(&self, token: &str) -> Option<MagicLink> {
        self.links
            .read()
            .ok()?
            .get(&token.to_ascii_lowercase())
            .cloned()
    }

    /// Number of stored links (including used ones not yet purged).
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.read().map_or(0, |links| links.len())
    }

    /// Whether the store holds no links.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("links", &self.len())
            .field("ttl", &self.ttl)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

/// Generate a 256-bit token from the OS random source, rendered as 64
/// lowercase hex characters.
///
/// # Errors
///
/// Returns `AuthError::InternalError` if the OS random source is unavailable.
pub fn generate_token() -> Result<String> {
    generate_token_with(&mut OsRng)
}

fn generate_token_with(rng: &mut dyn RngCore) -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    rng.try_fill_bytes(&mut bytes)
        .map_err(|e| AuthError::InternalError(format!("Secure random source failed: {e}")))?;
    Ok(hex::encode(bytes))
}

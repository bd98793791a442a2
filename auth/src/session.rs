//! Stateless session credentials.
//!
//! A credential is an HS256 JWT whose payload carries
//! `{user_id, email, iat, exp}` (Unix seconds). Nothing is stored server-side:
//! validity depends only on the signature and on `exp` at validation time.
//!
//! Expiry is checked against the injected [`Clock`](crate::clock::Clock)
//! rather than inside `jsonwebtoken`, so tests control time.

use crate::clock::SharedClock;
use crate::error::{AuthError, CredentialError, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Claims embedded in a session credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User identity.
    pub user_id: String,

    /// User email.
    pub email: String,

    /// Issued at (Unix seconds).
    pub iat: i64,

    /// Expires at (Unix seconds).
    pub exp: i64,
}

impl SessionClaims {
    /// Expiry as a timestamp.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }

    /// Issue time as a timestamp.
    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.iat, 0).unwrap_or_default()
    }
}

/// A freshly signed credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedSession {
    /// Compact three-segment credential.
    pub token: String,

    /// The claims that were signed.
    pub claims: SessionClaims,
}

/// Signs and verifies session credentials with one process-wide secret.
pub struct SessionCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
    clock: SharedClock,
}

impl SessionCodec {
    /// Create a codec for `secret` issuing credentials valid for `ttl`.
    #[must_use]
    pub fn new(secret: &[u8], ttl: Duration, clock: SharedClock) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
            clock,
        }
    }

    /// Sign a credential for the identity, issued now.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InternalError` if the expiry is not representable
    /// or encoding fails.
    pub fn sign(&self, user_id: &str, email: &str) -> Result<SignedSession> {
        self.sign_with_min_expiry(user_id, email, i64::MIN)
    }

    /// Sign a credential whose `exp` is at least `min_exp` (Unix seconds).
    ///
    /// Used by refresh so a renewed credential always expires strictly later
    /// than the one it replaces, even within the same second.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InternalError` if the expiry is not representable
    /// or encoding fails.
    pub fn sign_with_min_expiry(
        &self,
        user_id: &str,
        email: &str,
        min_exp: i64,
    ) -> Result<SignedSession> {
        let now = self.clock.now();
        let expires_at = now.checked_add_signed(self.ttl).ok_or_else(|| {
            AuthError::InternalError(format!("Session TTL {} overflows", self.ttl))
        })?;

        let claims = SessionClaims {
            user_id: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp().max(min_exp),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InternalError(format!("Failed to sign session: {e}")))?;

        Ok(SignedSession { token, claims })
    }

    /// Verify a credential and return its claims.
    ///
    /// # Errors
    ///
    /// - `CredentialError::Malformed` if it cannot be parsed
    /// - `CredentialError::InvalidSignature` if the integrity check fails
    /// - `CredentialError::Expired` if the current time is past `exp`
    pub fn verify(&self, credential: &str) -> std::result::Result<SessionClaims, CredentialError> {
        let data = decode::<SessionClaims>(credential, &self.decoding_key, &self.validation)?;

        if self.clock.now().timestamp() > data.claims.exp {
            return Err(CredentialError::Expired);
        }

        Ok(data.claims)
    }
}

impl fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCodec")
            .field("algorithm", &"HS256")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

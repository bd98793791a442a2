//! Error types for magic-link authentication.
//!
//! Two layers exist. Component-level enums ([`ConsumeError`],
//! [`CredentialError`]) keep the precise failure reason for logging. The
//! public [`AuthError`] is what callers of the coordinator see, and it
//! deliberately merges reasons that would otherwise act as an oracle.

use thiserror::Error;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Public error taxonomy surfaced by [`crate::AuthCoordinator`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Admission
    // ═══════════════════════════════════════════════════════════

    /// Too many link requests for this identity. Transient.
    #[error("Rate limit exceeded, please try again later")]
    RateLimitExceeded,

    // ═══════════════════════════════════════════════════════════
    // Magic links
    // ═══════════════════════════════════════════════════════════

    /// Magic link is unknown or has expired.
    ///
    /// Both cases share one variant so that callers cannot probe which
    /// tokens exist.
    #[error("Invalid or expired link")]
    InvalidOrExpired,

    /// Magic link was already consumed.
    #[error("This link has already been used")]
    AlreadyUsed,

    // ═══════════════════════════════════════════════════════════
    // Session credentials
    // ═══════════════════════════════════════════════════════════

    /// Session credential is malformed, forged or expired.
    #[error("Invalid credential")]
    InvalidCredential,

    // ═══════════════════════════════════════════════════════════
    // System
    // ═══════════════════════════════════════════════════════════

    /// Internal failure (random source, poisoned lock, signing).
    ///
    /// The message is for logs only and should not be shown to users.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    /// Returns `true` if this error is caused by what the caller presented.
    ///
    /// # Examples
    ///
    /// ```
    /// # use magiclink_auth::AuthError;
    /// assert!(AuthError::InvalidOrExpired.is_user_error());
    /// assert!(!AuthError::InternalError("rng".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidOrExpired | Self::AlreadyUsed | Self::InvalidCredential
        )
    }

    /// Returns `true` if retrying the same request later may succeed.
    ///
    /// # Examples
    ///
    /// ```
    /// # use magiclink_auth::AuthError;
    /// assert!(AuthError::RateLimitExceeded.is_retryable());
    /// assert!(!AuthError::AlreadyUsed.is_retryable());
    /// ```
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimitExceeded | Self::InternalError(_))
    }

    /// Message suitable for end users.
    ///
    /// Identical to `Display` except for internal errors, whose detail is
    /// replaced by a generic sentence.
    #[must_use]
    pub fn sanitized_message(&self) -> String {
        match self {
            Self::InternalError(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

/// Why [`crate::stores::TokenStore::consume`] rejected a token.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeError {
    /// No link with this token.
    #[error("token not found")]
    NotFound,

    /// Link expired before it was consumed. The entry has been evicted.
    #[error("token expired")]
    Expired,

    /// Link was consumed before. The entry is kept.
    #[error("token already used")]
    AlreadyUsed,

    /// The store could not be read (poisoned lock).
    #[error("token store unavailable")]
    Unavailable,
}

impl From<ConsumeError> for AuthError {
    fn from(err: ConsumeError) -> Self {
        match err {
            ConsumeError::NotFound | ConsumeError::Expired => Self::InvalidOrExpired,
            ConsumeError::AlreadyUsed => Self::AlreadyUsed,
            ConsumeError::Unavailable => Self::InternalError(err.to_string()),
        }
    }
}

/// Why [`crate::session::SessionCodec::verify`] rejected a credential.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CredentialError {
    /// Not a parseable three-segment credential.
    #[error("credential is malformed")]
    Malformed,

    /// Integrity check failed.
    #[error("credential signature is invalid")]
    InvalidSignature,

    /// Signature is fine but the credential is past its expiry.
    #[error("credential has expired")]
    Expired,
}

impl From<CredentialError> for AuthError {
    fn from(_: CredentialError) -> Self {
        Self::InvalidCredential
    }
}

impl From<jsonwebtoken::errors::Error> for CredentialError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => Self::InvalidSignature,
            ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Malformed,
        }
    }
}

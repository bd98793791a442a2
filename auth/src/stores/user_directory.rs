//! In-memory user registry keyed by email.

use crate::clock::SharedClock;
use crate::error::{AuthError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque identity (UUID v4 string).
    pub id: String,

    /// Email, the lookup key.
    pub email: String,

    /// When the user was first seen.
    pub created_at: DateTime<Utc>,
}

/// Result of [`UserDirectory::get_or_create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    /// The user record.
    pub user: User,

    /// `true` only for the call that created the user.
    pub is_new: bool,
}

/// Identity registry. Users are never removed.
#[derive(Debug)]
pub struct UserDirectory {
    users: RwLock<HashMap<String, User>>,
    clock: SharedClock,
}

impl UserDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new(clock: SharedClock) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Return the user for `email`, creating it if absent.
    ///
    /// Check and insert happen under one write lock, so concurrent callers
    /// for the same unknown email get one identity and exactly one of them
    /// sees `is_new = true`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InternalError` if the lock is poisoned.
    pub fn get_or_create(&self, email: &str) -> Result<Enrollment> {
        let mut users = self
            .users
            .write()
            .map_err(|_| AuthError::InternalError("User directory lock poisoned".into()))?;

        if let Some(user) = users.get(email) {
            return Ok(Enrollment {
                user: user.clone(),
                is_new: false,
            });
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            created_at: self.clock.now(),
        };
        users.insert(email.to_string(), user.clone());

        tracing::info!(user_id = %user.id, email = %email, "Created user");
        Ok(Enrollment { user, is_new: true })
    }

    /// Look up a user by email.
    #[must_use]
    pub fn get_by_email(&self, email: &str) -> Option<User> {
        self.users.read().ok()?.get(email).cloned()
    }

    /// Number of registered users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.read().map_or(0, |users| users.len())
    }

    /// Whether no user has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

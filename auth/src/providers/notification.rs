//! Notification sender trait.

use crate::message::RenderedMessage;
use thiserror::Error;

/// Delivery failure reported by a [`NotificationSender`].
///
/// Never surfaced to callers of the coordinator: the dispatcher logs it and
/// moves on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// The channel rejected or failed to deliver the message.
    #[error("Notification delivery failed: {0}")]
    DeliveryFailed(String),

    /// The channel is not configured or not reachable.
    #[error("Notification channel unavailable: {0}")]
    Unavailable(String),
}

/// Notification sender.
///
/// This trait abstracts over the channel that delivers a magic link to a
/// person (SMTP, transactional email APIs, SMS, push).
pub trait NotificationSender: Send + Sync {
    /// Deliver `message` to `destination` (an email address for email
    /// channels).
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network request fails
    /// - The provider rejects the request
    fn send(
        &self,
        destination: &str,
        message: &RenderedMessage,
    ) -> impl std::future::Future<Output = Result<(), NotificationError>> + Send;
}

//! Console notification sender for development and testing.

use crate::message::RenderedMessage;
use crate::providers::{NotificationError, NotificationSender};
use tracing::info;

/// Console notification sender.
///
/// Logs the magic link instead of delivering it. Useful in development, and
/// as the fallback when no real delivery channel is configured: the issued
/// token stays usable directly.
///
/// # Examples
///
/// ```ignore
/// use magiclink_auth::providers::ConsoleNotifier;
///
/// let notifier = ConsoleNotifier::new();
/// notifier.send("user@example.com", &message).await?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    /// Create a new console notifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl NotificationSender for ConsoleNotifier {
    async fn send(
        &self,
        destination: &str,
        message: &RenderedMessage,
    ) -> Result<(), NotificationError> {
        info!(
            to = %destination,
            subject = %message.subject,
            link = %message.link,
            "📧 Magic Link (Development Mode)"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::render_magic_link;
    use chrono::Duration;

    #[test]
    fn test_console_notifier_always_succeeds() {
        let message = render_magic_link("onboardingapp://auth/verify?token=t", Duration::minutes(15));
        let result =
            tokio_test::block_on(ConsoleNotifier::new().send("user@example.com", &message));
        assert!(result.is_ok());
    }
}

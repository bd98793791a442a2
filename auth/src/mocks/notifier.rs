//! Mock notification senders for testing.

use crate::message::RenderedMessage;
use crate::providers::{NotificationError, NotificationSender};
use std::sync::Mutex;
use tokio::sync::Semaphore;

/// Records every message instead of delivering it.
#[derive(Debug)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, RenderedMessage)>>,
    gate: Semaphore,
}

impl RecordingNotifier {
    /// Create a recorder that accepts messages immediately.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            gate: Semaphore::new(Semaphore::MAX_PERMITS),
        }
    }

    /// Create a recorder whose sends wait until [`release`](Self::release).
    #[must_use]
    pub fn blocked() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            gate: Semaphore::new(0),
        }
    }

    /// Let pending and future sends through.
    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    /// All recorded `(destination, message)` pairs, in delivery order.
    #[must_use]
    pub fn sent(&self) -> Vec<(String, RenderedMessage)> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSender for RecordingNotifier {
    async fn send(
        &self,
        destination: &str,
        message: &RenderedMessage,
    ) -> Result<(), NotificationError> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| NotificationError::Unavailable("gate closed".to_string()))?;

        self.sent
            .lock()
            .map_err(|_| NotificationError::DeliveryFailed("recorder poisoned".to_string()))?
            .push((destination.to_string(), message.clone()));
        Ok(())
    }
}

/// Fails every send.
#[derive(Debug, Clone, Default)]
pub struct FailingNotifier;

impl FailingNotifier {
    /// Create a failing notifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl NotificationSender for FailingNotifier {
    async fn send(
        &self,
        _destination: &str,
        _message: &RenderedMessage,
    ) -> Result<(), NotificationError> {
        Err(NotificationError::DeliveryFailed(
            "SMTP server unreachable".to_string(),
        ))
    }
}

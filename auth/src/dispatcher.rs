//! Fire-and-forget notification delivery.
//!
//! The coordinator hands rendered messages to a [`NotificationDispatcher`],
//! which queues them on a bounded channel and returns immediately. A single
//! worker task drains the queue and calls the [`NotificationSender`]. Each
//! send runs in its own task so a panicking sender is logged instead of
//! taking the worker down.
//!
//! # Delivery semantics
//!
//! Best-effort, at-most-once. A full or closed queue drops the message with a
//! warning; a failed send is logged and not retried. Neither outcome touches
//! the token that was already issued.

use crate::message::RenderedMessage;
use crate::providers::NotificationSender;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// One queued notification.
#[derive(Debug, Clone)]
pub struct NotificationJob {
    /// Recipient address.
    pub destination: String,

    /// Message to deliver.
    pub message: RenderedMessage,
}

/// Delivery counters, updated by the worker.
#[derive(Debug, Default)]
pub struct DispatchStats {
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl DispatchStats {
    /// Messages the sender accepted.
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Messages the sender rejected or panicked on.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Messages never queued (queue full or closed).
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Bounded queue plus supervising worker for notification delivery.
#[derive(Debug)]
pub struct NotificationDispatcher {
    queue: Mutex<Option<mpsc::Sender<NotificationJob>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<DispatchStats>,
}

impl NotificationDispatcher {
    /// Start the worker for `sender` with a queue bounded at `capacity`
    /// (at least 1).
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn<N>(sender: Arc<N>, capacity: usize) -> Self
    where
        N: NotificationSender + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let stats = Arc::new(DispatchStats::default());
        let worker = tokio::spawn(run_worker(sender, rx, Arc::clone(&stats)));

        Self {
            queue: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            stats,
        }
    }

    /// Queue a job without waiting. Returns `true` if it was queued.
    pub fn dispatch(&self, job: NotificationJob) -> bool {
        let Ok(queue) = self.queue.lock() else {
            error!("Notification queue lock poisoned, dropping message");
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        let Some(tx) = queue.as_ref() else {
            warn!(to = %job.destination, "Notification dispatcher is shut down, dropping message");
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        match tx.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(job)) => {
                warn!(to = %job.destination, "Notification queue full, dropping message");
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(TrySendError::Closed(job)) => {
                warn!(to = %job.destination, "Notification worker stopped, dropping message");
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Delivery counters.
    #[must_use]
    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Close the queue and wait for the worker to drain it.
    ///
    /// Later `dispatch` calls drop their message. Calling this twice is a
    /// no-op.
    pub async fn shutdown(&self) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.take();
        }

        let worker = self.worker.lock().ok().and_then(|mut worker| worker.take());
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!(error = %e, "Notification worker terminated abnormally");
            }
        }
    }
}

async fn run_worker<N>(
    sender: Arc<N>,
    mut rx: mpsc::Receiver<NotificationJob>,
    stats: Arc<DispatchStats>,
) where
    N: NotificationSender + 'static,
{
    while let Some(job) = rx.recv().await {
        let destination = job.destination.clone();
        let sender = Arc::clone(&sender);

        let outcome =
            tokio::spawn(async move { sender.send(&job.destination, &job.message).await }).await;

        match outcome {
            Ok(Ok(())) => {
                stats.delivered.fetch_add(1, Ordering::Relaxed);
                debug!(to = %destination, "Magic link delivered");
            }
            Ok(Err(e)) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    to = %destination,
                    error = %e,
                    "Failed to deliver magic link, token remains valid"
                );
            }
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(to = %destination, error = %e, "Notification sender panicked");
            }
        }
    }

    debug!("Notification worker stopped");
}

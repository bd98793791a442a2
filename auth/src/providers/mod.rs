//! Authentication providers.
//!
//! Providers are **interfaces** for the collaborators the core does not own.
//! The only one is notification delivery: the coordinator depends on
//! [`NotificationSender`] and never on a concrete channel.
//!
//! This enables:
//! - **Testing**: recording or failing senders from `mocks`
//! - **Development**: [`ConsoleNotifier`] logs the link
//! - **Production**: any email/SMS integration implementing the trait

pub mod console;
pub mod notification;

pub use console::ConsoleNotifier;
pub use notification::{NotificationError, NotificationSender};

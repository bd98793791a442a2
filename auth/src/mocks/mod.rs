//! Mock implementations for testing.
//!
//! This module provides a controllable clock, a failing random source and
//! in-memory notification senders for use in unit and integration tests.

pub mod clock;
pub mod notifier;
pub mod rng;

pub use clock::ManualClock;
pub use notifier::{FailingNotifier, RecordingNotifier};
pub use rng::FailingRng;

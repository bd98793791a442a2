//! Time source abstraction.
//!
//! Every expiry and refill computation in this crate asks a [`Clock`] for the
//! current time instead of calling `Utc::now()` directly, so tests can move
//! time forward deterministically (see `mocks::ManualClock`).

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Clock trait - abstracts time operations for testability.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by `Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Shared clock handle passed to every component.
pub type SharedClock = Arc<dyn Clock>;

/// Convenience constructor for the production clock.
#[must_use]
pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_monotonic_enough() {
        let clock = system_clock();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}

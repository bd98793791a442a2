//! Manually advanced clock for testing.

use crate::clock::Clock;
use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// 2025-01-01T00:00:00Z, the default start of a [`ManualClock`].
pub const TEST_EPOCH_SECS: i64 = 1_735_689_600;

/// Clock that only moves when told to.
///
/// # Example
///
/// ```
/// use magiclink_auth::clock::Clock;
/// use magiclink_auth::mocks::ManualClock;
/// use chrono::Duration;
///
/// let clock = ManualClock::default();
/// let start = clock.now();
/// clock.advance(Duration::minutes(12));
/// assert_eq!(clock.now() - start, Duration::minutes(12));
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `time`.
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(time),
        }
    }

    /// Move the clock forward (or backward, for negative durations).
    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, time: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = time;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(DateTime::from_timestamp(TEST_EPOCH_SECS, 0).unwrap_or_default())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map_or_else(|poisoned| *poisoned.into_inner(), |now| *now)
    }
}

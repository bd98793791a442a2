//! In-memory token bucket rate limiter.
//!
//! # Algorithm
//!
//! One bucket per identity (email):
//! 1. Unseen identity gets a full bucket
//! 2. Tokens are replenished proportionally to the time since last refill,
//!    capped at capacity
//! 3. An admission consumes one whole token
//!
//! The default policy (capacity 5, one token per 12 minutes) allows a burst of
//! five link requests and a steady state of five per hour.

use crate::clock::SharedClock;
use crate::error::{AuthError, Result};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// Per-identity bucket state.
#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    last_refill: DateTime<Utc>,
}

/// Token bucket rate limiter keyed by identity.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
    capacity: u32,
    refill_interval: Duration,
    clock: SharedClock,
}

impl RateLimiter {
    /// Create a limiter with `capacity` burst and one token per `refill_interval`.
    #[must_use]
    pub fn new(capacity: u32, refill_interval: Duration, clock: SharedClock) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            capacity,
            refill_interval,
            clock,
        }
    }

    /// Bucket capacity.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Admit or deny one request for `identity`.
    ///
    /// Denial is a normal outcome, not an error. A poisoned lock also denies.
    pub fn allow(&self, identity: &str) -> bool {
        let now = self.clock.now();
        let Ok(mut buckets) = self.buckets.lock() else {
            tracing::error!(key = %identity, "Rate limiter lock poisoned, denying request");
            return false;
        };

        let bucket = buckets
            .entry(identity.to_string())
            .or_insert_with(|| self.full_bucket(now));
        self.refill(bucket, now);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            tracing::debug!(
                key = %identity,
                remaining = bucket.tokens,
                capacity = self.capacity,
                "Rate limit check passed"
            );
            true
        } else {
            tracing::warn!(
                rate_limit_exceeded = true,
                key = %identity,
                capacity = self.capacity,
                refill_secs = self.refill_interval.num_seconds(),
                "Rate limit exceeded"
            );
            false
        }
    }

    /// Tokens currently available for `identity`, after replenishment.
    ///
    /// Does not consume and does not create a bucket.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InternalError` if the lock is poisoned.
    pub fn remaining(&self, identity: &str) -> Result<f64> {
        let now = self.clock.now();
        let buckets = self
            .buckets
            .lock()
            .map_err(|_| AuthError::InternalError("Rate limiter lock poisoned".into()))?;

        Ok(buckets.get(identity).map_or(f64::from(self.capacity), |bucket| {
            let mut bucket = *bucket;
            self.refill(&mut bucket, now);
            bucket.tokens
        }))
    }

    /// Drop buckets that have refilled to capacity.
    ///
    /// A full bucket behaves exactly like a missing one, so this only
    /// reclaims memory.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InternalError` if the lock is poisoned.
    pub fn purge_idle(&self) -> Result<usize> {
        let now = self.clock.now();
        let mut buckets = self
            .buckets
            .lock()
            .map_err(|_| AuthError::InternalError("Rate limiter lock poisoned".into()))?;

        let before = buckets.len();
        buckets.retain(|_, bucket| {
            self.refill(bucket, now);
            bucket.tokens < f64::from(self.capacity)
        });
        Ok(before - buckets.len())
    }

    /// Number of tracked identities.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.buckets.lock().map_or(0, |buckets| buckets.len())
    }

    fn full_bucket(&self, now: DateTime<Utc>) -> Bucket {
        Bucket {
            tokens: f64::from(self.capacity),
            last_refill: now,
        }
    }

    #[allow(clippy::cast_precision_loss)] // millisecond spans stay far below 2^52
    fn refill(&self, bucket: &mut Bucket, now: DateTime<Utc>) {
        let capacity = f64::from(self.capacity);
        let interval_ms = self.refill_interval.num_milliseconds();

        if interval_ms <= 0 {
            bucket.tokens = capacity;
            bucket.last_refill = now;
            return;
        }

        let elapsed_ms = (now - bucket.last_refill).num_milliseconds();
        if elapsed_ms <= 0 {
            return;
        }

        let added = elapsed_ms as f64 / interval_ms as f64;
        if bucket.tokens + added >= capacity {
            bucket.tokens = capacity;
            bucket.last_refill = now;
        } else {
            // Only the whole milliseconds counted; the remainder carries over.
            bucket.tokens += added;
            bucket.last_refill += Duration::milliseconds(elapsed_ms);
        }
    }
}

//! Token bucket state.
//!
//! The bucket is refilled lazily: every access reconciles `tokens` with the
//! time elapsed since `last_refill`. There is no per-bucket timer.
//!
//! This type is pure state and does no locking. Concurrent callers go through
//! [`SharedBucket`](crate::application::registry::SharedBucket), which wraps
//! one bucket in its own mutex.

use std::time::{Duration, Instant};

/// Token bucket holding up to `capacity` tokens, refilled at `refill_rate`
/// tokens per second.
///
/// # Example
/// ```
/// use gateway_admission::TokenBucket;
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let mut bucket = TokenBucket::new(2.0, 1.0, start);
///
/// assert!(bucket.try_consume(start));
/// assert!(bucket.try_consume(start));
/// assert!(!bucket.try_consume(start));
///
/// // One second later one token has come back
/// assert!(bucket.try_consume(start + Duration::from_secs(1)));
/// ```
#[derive(Debug, Clone)]
pub struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket.
    ///
    /// Negative or non-finite `capacity` / `refill_rate` are treated as zero.
    pub fn new(capacity: f64, refill_rate: f64, now: Instant) -> Self {
        let capacity = sanitize(capacity);
        Self {
            tokens: capacity,
            capacity,
            refill_rate: sanitize(refill_rate),
            last_refill: now,
        }
    }

    /// Refill for the time elapsed since the last access, then take one
    /// token if available.
    ///
    /// A `now` earlier than the last refill counts as zero elapsed time.
    pub fn try_consume(&mut self, now: Instant) -> bool {
        self.refill(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Reconcile `tokens` with elapsed time and stamp `last_refill = now`.
    pub fn refill(&mut self, now: Instant) {
        self.tokens = self.tokens_at(now);
        if now > self.last_refill {
            self.last_refill = now;
        }
    }

    /// Token level the bucket would hold at `now`, without mutating it.
    pub fn tokens_at(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_refill);
        (self.tokens + elapsed.as_secs_f64() * self.refill_rate).min(self.capacity)
    }

    /// Whether the bucket would be at capacity at `now`.
    pub fn is_full_at(&self, now: Instant) -> bool {
        self.tokens_at(now) >= self.capacity
    }

    /// Time since the bucket was last reconciled.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_refill)
    }

    /// Whole tokens left as of the last reconciliation.
    pub fn remaining(&self) -> u64 {
        self.tokens.floor() as u64
    }

    /// Current token count as of the last reconciliation.
    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Maximum burst size.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Tokens added per second.
    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    /// Instant of the last reconciliation.
    pub fn last_refill(&self) -> Instant {
        self.last_refill
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

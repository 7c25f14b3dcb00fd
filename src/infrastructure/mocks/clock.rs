//! Mock clock for testing.

use crate::application::ports::Clock;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Mock clock for testing.
///
/// Allows tests to control time progression explicitly, so refill and
/// staleness behaviour can be checked without sleeping.
///
/// # Examples
///
/// ```
/// use gateway_admission::infrastructure::mocks::MockClock;
/// use gateway_admission::Clock;
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let clock = MockClock::new(start);
///
/// clock.advance(Duration::from_secs(20));
/// assert_eq!(clock.now(), start + Duration::from_secs(20));
/// ```
///
/// # Thread Safety
///
/// All clones share the same underlying time value, so advancing time in
/// one clone affects all clones.
#[derive(Debug, Clone)]
pub struct MockClock {
    current_time: Arc<Mutex<Instant>>,
}

impl MockClock {
    /// Create a mock clock starting at a specific instant.
    pub fn new(start: Instant) -> Self {
        Self {
            current_time: Arc::new(Mutex::new(start)),
        }
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: Duration) {
        *self.current_time.lock() += duration;
    }

    /// Set the clock to a specific instant.
    ///
    /// Setting an instant earlier than the current one simulates clock skew.
    pub fn set(&self, instant: Instant) {
        *self.current_time.lock() = instant;
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.current_time.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bucket::TokenBucket;
    use std::thread;

    #[test]
    fn test_mock_clock() {
        let start = Instant::now();
        let clock = MockClock::new(start);

        assert_eq!(clock.now(), start);

        clock.advance(Duration::from_secs(10));
        assert_eq!(clock.now(), start + Duration::from_secs(10));

        let new_time = start + Duration::from_secs(100);
        clock.set(new_time);
        assert_eq!(clock.now(), new_time);
    }

    #[test]
    fn test_clones_share_time() {
        let start = Instant::now();
        let clock = MockClock::new(start);
        let clock_clone = clock.clone();

        thread::spawn(move || clock_clone.advance(Duration::from_secs(5)))
            .join()
            .unwrap();

        assert_eq!(clock.now(), start + Duration::from_secs(5));
    }

    #[test]
    fn test_skewed_clock_does_not_drain_bucket() {
        let start = Instant::now() + Duration::from_secs(120);
        let clock = MockClock::new(start);
        let mut bucket = TokenBucket::new(2.0, 1.0, clock.now());
        assert!(bucket.try_consume(clock.now()));

        clock.set(start - Duration::from_secs(60));
        assert!(bucket.try_consume(clock.now()));
        assert!(!bucket.try_consume(clock.now()));

        // Back at the original time nothing was lost or gained
        clock.set(start);
        assert!(!bucket.try_consume(clock.now()));
        clock.advance(Duration::from_secs(1));
        assert!(bucket.try_consume(clock.now()));
    }
}

//! Endpoint rate limiting policies.
//!
//! A policy is expressed as "N requests per window" and converted once into
//! a bucket capacity and a refill rate in tokens per second.

use ahash::RandomState;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Error returned when a policy is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// Window duration must be greater than zero
    #[error("policy window must be greater than 0")]
    ZeroWindow,
}

/// Rate limit for one logical endpoint.
///
/// # Example
/// ```
/// use gateway_admission::EndpointPolicy;
/// use std::time::Duration;
///
/// let policy = EndpointPolicy::new(3, Duration::from_secs(60)).unwrap();
/// assert_eq!(policy.capacity(), 3.0);
/// assert!((policy.refill_rate() - 0.05).abs() < 1e-12);
/// assert_eq!(policy.retry_after_secs(), 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndpointPolicy {
    requests_per_window: u32,
    window: Duration,
    refill_rate: f64,
}

impl EndpointPolicy {
    /// Create a policy allowing `requests_per_window` requests per `window`.
    ///
    /// # Errors
    /// Returns `PolicyError::ZeroWindow` if `window` is zero.
    pub fn new(requests_per_window: u32, window: Duration) -> Result<Self, PolicyError> {
        if window.is_zero() {
            return Err(PolicyError::ZeroWindow);
        }
        Ok(Self {
            requests_per_window,
            window,
            refill_rate: f64::from(requests_per_window) / window.as_secs_f64(),
        })
    }

    /// `requests` per second.
    pub fn per_second(requests: u32) -> Self {
        Self::new(requests, Duration::from_secs(1)).expect("one second window is non-zero")
    }

    /// `requests` per minute.
    pub fn per_minute(requests: u32) -> Self {
        Self::new(requests, Duration::from_secs(60)).expect("one minute window is non-zero")
    }

    /// Nominal limit reported to clients.
    pub fn requests_per_window(&self) -> u32 {
        self.requests_per_window
    }

    /// Window the limit is expressed over.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Maximum burst, equal to the per-window limit.
    pub fn capacity(&self) -> f64 {
        f64::from(self.requests_per_window)
    }

    /// Tokens added per second.
    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    /// Seconds a rejected client should wait before retrying.
    ///
    /// `ceil(1 / refill_rate)`, at least 1. A policy that never refills
    /// reports its window length instead.
    pub fn retry_after_secs(&self) -> u64 {
        if self.refill_rate > 0.0 {
            ((1.0 / self.refill_rate).ceil() as u64).max(1)
        } else {
            let secs = self.window.as_secs() + u64::from(self.window.subsec_nanos() > 0);
            secs.max(1)
        }
    }
}

impl Default for EndpointPolicy {
    /// 100 requests per minute.
    fn default() -> Self {
        Self::per_minute(100)
    }
}

/// Static endpoint → policy table with a default fallback.
///
/// Built once at startup and never mutated, so lookups need no locking.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    default: EndpointPolicy,
    endpoints: HashMap<String, EndpointPolicy, RandomState>,
}

impl PolicyTable {
    /// Create a table with only a default policy.
    pub fn new(default: EndpointPolicy) -> Self {
        Self {
            default,
            endpoints: HashMap::default(),
        }
    }

    /// Add or replace the policy for an endpoint.
    pub fn with_endpoint(mut self, endpoint_id: impl Into<String>, policy: EndpointPolicy) -> Self {
        self.endpoints.insert(endpoint_id.into(), policy);
        self
    }

    /// Exact-match lookup, falling back to the default policy.
    pub fn resolve(&self, endpoint_id: &str) -> &EndpointPolicy {
        self.endpoints.get(endpoint_id).unwrap_or(&self.default)
    }

    /// The fallback policy.
    pub fn default_policy(&self) -> &EndpointPolicy {
        &self.default
    }

    /// Number of endpoint-specific entries.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether the table has no endpoint-specific entries.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_bucket_parameters() {
        let policy = EndpointPolicy::new(120, Duration::from_secs(60)).unwrap();

        assert_eq!(policy.requests_per_window(), 120);
        assert_eq!(policy.capacity(), 120.0);
        assert!((policy.refill_rate() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_window_rejected() {
        assert_eq!(
            EndpointPolicy::new(10, Duration::ZERO),
            Err(PolicyError::ZeroWindow)
        );
    }

    #[test]
    fn test_zero_requests_allowed() {
        let policy = EndpointPolicy::new(0, Duration::from_secs(30)).unwrap();

        assert_eq!(policy.capacity(), 0.0);
        assert_eq!(policy.refill_rate(), 0.0);
        assert_eq!(policy.retry_after_secs(), 30);
    }

    #[test]
    fn test_retry_after() {
        assert_eq!(EndpointPolicy::per_minute(3).retry_after_secs(), 20);
        assert_eq!(EndpointPolicy::per_minute(7).retry_after_secs(), 9);
        // Faster than one token per second still hints at least a second
        assert_eq!(EndpointPolicy::per_second(50).retry_after_secs(), 1);
    }

    #[test]
    fn test_resolve_exact_match() {
        let table = PolicyTable::new(EndpointPolicy::per_minute(100))
            .with_endpoint("search", EndpointPolicy::per_minute(3))
            .with_endpoint("login", EndpointPolicy::per_minute(5));

        assert_eq!(table.resolve("search").requests_per_window(), 3);
        assert_eq!(table.resolve("login").requests_per_window(), 5);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let table = PolicyTable::new(EndpointPolicy::per_minute(42))
            .with_endpoint("search", EndpointPolicy::per_minute(3));

        assert_eq!(table.resolve("plants").requests_per_window(), 42);
        // No prefix or case-insensitive matching
        assert_eq!(table.resolve("Search").requests_per_window(), 42);
        assert_eq!(table.resolve("search/extra").requests_per_window(), 42);
    }

    #[test]
    fn test_default_table() {
        let table = PolicyTable::default();

        assert!(table.is_empty());
        assert_eq!(table.default_policy().requests_per_window(), 100);
        assert_eq!(table.default_policy().window(), Duration::from_secs(60));
    }
}

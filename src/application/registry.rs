//! Central registry of token buckets.
//!
//! The registry maps `(client_id, endpoint_id)` to a bucket, creating buckets
//! lazily from the endpoint's policy. All locking of the backing map lives
//! here; callers only ever see [`SharedBucket`] handles.

use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, Storage};
use crate::domain::{bucket::TokenBucket, key::BucketKey, policy::PolicyTable};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A token bucket guarded by its own lock.
///
/// The refill-then-consume sequence runs under this bucket's mutex only, so
/// accounting for one client/endpoint pair never waits on another.
pub struct SharedBucket {
    state: Mutex<TokenBucket>,
    clock: Arc<dyn Clock>,
}

impl SharedBucket {
    /// Wrap a bucket, reading time from `clock`.
    pub fn new(bucket: TokenBucket, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(bucket),
            clock,
        }
    }

    /// Atomically refill and try to take one token.
    pub fn try_consume(&self) -> bool {
        self.try_consume_remaining().0
    }

    /// Like [`try_consume`](Self::try_consume), also returning the token level
    /// observed right after the attempt.
    pub fn try_consume_remaining(&self) -> (bool, f64) {
        let mut state = self.state.lock();
        // Read the clock under the lock so timestamps are applied in order
        let now = self.clock.now();
        let allowed = state.try_consume(now);
        (allowed, state.tokens())
    }

    /// Copy of the current bucket state, without refilling.
    pub fn snapshot(&self) -> TokenBucket {
        self.state.lock().clone()
    }

    /// Full at `now` and idle for longer than `staleness`.
    fn is_stale(&self, staleness: Duration) -> bool {
        let state = self.state.lock();
        let now = self.clock.now();
        state.is_full_at(now) && state.idle_for(now) > staleness
    }
}

impl fmt::Debug for SharedBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBucket")
            .field("state", &*self.state.lock())
            .finish()
    }
}

/// Registry managing all bucket state.
///
/// This type is generic over the storage implementation. In production, use
/// `Arc<ShardedStorage>` (see [`DefaultStorage`](crate::DefaultStorage)).
#[derive(Clone)]
pub struct BucketRegistry<S>
where
    S: Storage<BucketKey, Arc<SharedBucket>> + Clone,
{
    storage: S,
    clock: Arc<dyn Clock>,
    policies: Arc<PolicyTable>,
    metrics: Metrics,
}

impl<S> BucketRegistry<S>
where
    S: Storage<BucketKey, Arc<SharedBucket>> + Clone,
{
    /// Create a new registry with storage, clock, and the policy table.
    pub fn new(storage: S, clock: Arc<dyn Clock>, policies: PolicyTable, metrics: Metrics) -> Self {
        Self {
            storage,
            clock,
            policies: Arc::new(policies),
            metrics,
        }
    }

    /// Get the bucket for `(client_id, endpoint_id)`, creating a full one on
    /// first use.
    ///
    /// Concurrent first access for the same key yields one bucket: the first
    /// insert wins and every caller receives it.
    pub fn acquire(&self, client_id: &str, endpoint_id: &str) -> Arc<SharedBucket> {
        let key = BucketKey::new(client_id, endpoint_id);

        if let Some(bucket) = self.storage.get(&key) {
            return bucket;
        }

        let policy = self.policies.resolve(endpoint_id);
        let (bucket, created) = self.storage.get_or_insert_with(key, || {
            let state = TokenBucket::new(policy.capacity(), policy.refill_rate(), self.clock.now());
            Arc::new(SharedBucket::new(state, Arc::clone(&self.clock)))
        });

        if created {
            self.metrics.record_bucket_created();
            tracing::debug!(
                client = client_id,
                endpoint = endpoint_id,
                capacity = policy.capacity(),
                refill_rate = policy.refill_rate(),
                "created rate limit bucket"
            );
        }

        bucket
    }

    /// Remove buckets that are full and have been idle longer than
    /// `staleness`.
    ///
    /// A bucket below capacity is always kept, as is one currently held by an
    /// in-flight request. Re-acquiring an evicted key creates a fresh full
    /// bucket, which behaves exactly like the one removed.
    ///
    /// # Returns
    /// Number of buckets removed.
    pub fn sweep(&self, staleness: Duration) -> usize {
        let mut evicted = 0;

        self.storage.retain(|_key, bucket| {
            // Handles are only cloned under the map lock retain is holding,
            // so a count of one means no request can be using this bucket.
            let evict = Arc::strong_count(bucket) == 1 && bucket.is_stale(staleness);
            if evict {
                evicted += 1;
            }
            !evict
        });

        self.metrics.record_evictions(evicted as u64);
        evicted
    }

    /// Whether a bucket exists for the key.
    pub fn contains(&self, client_id: &str, endpoint_id: &str) -> bool {
        self.storage.contains(&BucketKey::new(client_id, endpoint_id))
    }

    /// Get the policy table.
    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    /// Get the clock.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Get the metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Get the number of tracked buckets.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

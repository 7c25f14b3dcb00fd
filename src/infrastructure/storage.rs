//! Storage implementations for bucket state.
//!
//! Provides concurrent, sharded storage for the bucket registry.

use crate::application::ports::Storage;
use crate::application::registry::SharedBucket;
use crate::domain::key::BucketKey;
use ahash::RandomState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Storage type used by [`AdmissionController::builder`](crate::AdmissionController::builder).
pub type DefaultStorage = Arc<ShardedStorage<BucketKey, Arc<SharedBucket>>>;

/// Thread-safe sharded storage backed by DashMap.
///
/// Each shard is a read-preferring `RwLock`: lookups of existing keys take the
/// shard's shared lock, inserts take its write lock. Keys in different shards
/// never contend.
#[derive(Debug)]
pub struct ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    map: DashMap<K, V, RandomState>,
}

impl<K, V> ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create a new sharded storage instance.
    pub fn new() -> Self {
        Self {
            map: DashMap::with_hasher(RandomState::new()),
        }
    }
}

impl<K, V> Default for ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Storage<K, V> for ShardedStorage<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + std::fmt::Debug,
    V: Clone + Send + Sync + std::fmt::Debug,
{
    fn get(&self, key: &K) -> Option<V> {
        self.map.get(key).map(|entry| entry.value().clone())
    }

    fn get_or_insert_with(&self, key: K, factory: impl FnOnce() -> V) -> (V, bool) {
        // The entry API holds the shard write lock, so the presence check and
        // the insert cannot be split by another writer.
        match self.map.entry(key) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => (entry.insert(factory()).value().clone(), true),
        }
    }

    fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.map.retain(f);
    }
}

// Implement Storage for Arc<ShardedStorage> to allow it to be used directly
impl<K, V> Storage<K, V> for Arc<ShardedStorage<K, V>>
where
    K: Hash + Eq + Clone + Send + Sync + std::fmt::Debug,
    V: Clone + Send + Sync + std::fmt::Debug,
{
    fn get(&self, key: &K) -> Option<V> {
        (**self).get(key)
    }

    fn get_or_insert_with(&self, key: K, factory: impl FnOnce() -> V) -> (V, bool) {
        (**self).get_or_insert_with(key, factory)
    }

    fn contains(&self, key: &K) -> bool {
        (**self).contains(key)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }

    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        (**self).retain(f)
    }
}

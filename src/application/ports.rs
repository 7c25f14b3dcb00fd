//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use std::fmt::Debug;
use std::hash::Hash;
use std::time::Instant;

/// Port for obtaining current time.
///
/// Refill and staleness arithmetic only ever read time through this trait,
/// so tests can drive it with a controllable clock instead of sleeping.
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
///
/// Implementations must return non-decreasing values.
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// Port for concurrent key-value storage.
///
/// Values are handed out by clone, so `V` is expected to be a cheap handle
/// such as an `Arc`. No map lock is held once a method returns.
/// Infrastructure provides concrete implementations (ShardedStorage).
pub trait Storage<K, V>: Send + Sync + Debug
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    /// Look up a value under a shared lock.
    fn get(&self, key: &K) -> Option<V>;

    /// Return the value for `key`, inserting the one built by `factory` if the
    /// key is absent.
    ///
    /// Insert-if-absent is atomic per key: when several callers race on the
    /// same missing key exactly one factory result is stored and every caller
    /// receives that value.
    ///
    /// # Returns
    /// The stored value and whether this call inserted it.
    fn get_or_insert_with(&self, key: K, factory: impl FnOnce() -> V) -> (V, bool);

    /// Check whether a key is present.
    fn contains(&self, key: &K) -> bool;

    /// Get the number of entries in the storage.
    fn len(&self) -> usize;

    /// Check if the storage is empty.
    fn is_empty(&self) -> bool;

    /// Remove entries for which the predicate returns false.
    ///
    /// The predicate runs under the write lock guarding the entry, so no
    /// concurrent `get` can hand out a value while it is being judged.
    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool;
}

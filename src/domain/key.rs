//! Registry keys.
//!
//! Rate limit accounting is partitioned by the pair (client, endpoint): the
//! same client has independent quotas on different endpoints, and different
//! clients on the same endpoint never share a bucket.

use std::fmt;
use std::sync::Arc;

/// Composite `(client_id, endpoint_id)` key.
///
/// Both halves are reference counted so cloning a key on the hot path is
/// two pointer bumps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    client_id: Arc<str>,
    endpoint_id: Arc<str>,
}

impl BucketKey {
    /// Build a key from its two halves.
    pub fn new(client_id: &str, endpoint_id: &str) -> Self {
        Self {
            client_id: Arc::from(client_id),
            endpoint_id: Arc::from(endpoint_id),
        }
    }

    /// Client identifier (usually an IP address).
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Logical endpoint identifier.
    pub fn endpoint_id(&self) -> &str {
        &self.endpoint_id
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.client_id, self.endpoint_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_same_parts_are_equal() {
        assert_eq!(
            BucketKey::new("10.0.0.1", "search"),
            BucketKey::new("10.0.0.1", "search")
        );
    }

    #[test]
    fn test_parts_are_not_interchangeable() {
        let keys: HashSet<_> = [
            BucketKey::new("a", "b"),
            BucketKey::new("b", "a"),
            BucketKey::new("a", "a"),
        ]
        .into_iter()
        .collect();

        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn test_display() {
        let key = BucketKey::new("203.0.113.7", "gardens.list");
        assert_eq!(key.to_string(), "203.0.113.7@gardens.list");
        assert_eq!(key.client_id(), "203.0.113.7");
        assert_eq!(key.endpoint_id(), "gardens.list");
    }
}

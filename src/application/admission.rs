//! Admission decisions.
//!
//! The controller ties the registry and the policy table together and turns a
//! bucket's consume result into an [`AdmissionDecision`].

use crate::application::metrics::Metrics;
use crate::application::ports::Storage;
use crate::application::reaper::{Reaper, ReaperConfig};
use crate::application::registry::{BucketRegistry, SharedBucket};
use crate::domain::{decision::AdmissionDecision, key::BucketKey};
use std::sync::Arc;

/// Decides whether requests are admitted.
///
/// Cheap to clone; clones share the registry, its buckets and the metrics.
#[derive(Clone)]
pub struct AdmissionController<S>
where
    S: Storage<BucketKey, Arc<SharedBucket>> + Clone,
{
    registry: BucketRegistry<S>,
    reaper_config: ReaperConfig,
}

impl<S> AdmissionController<S>
where
    S: Storage<BucketKey, Arc<SharedBucket>> + Clone,
{
    /// Create a new controller.
    ///
    /// # Arguments
    /// * `registry` - The bucket registry (which contains the clock and policies)
    /// * `reaper_config` - Schedule for the reaper returned by [`reaper`](Self::reaper)
    pub fn new(registry: BucketRegistry<S>, reaper_config: ReaperConfig) -> Self {
        Self {
            registry,
            reaper_config,
        }
    }

    /// Check one request from `client_id` against `endpoint_id`.
    ///
    /// Never blocks on I/O: the only waits are the registry shard lock for a
    /// lookup and the bucket's own mutex.
    pub fn check(&self, client_id: &str, endpoint_id: &str) -> AdmissionDecision {
        let policy = self.registry.policies().resolve(endpoint_id);
        let bucket = self.registry.acquire(client_id, endpoint_id);
        let (allowed, remaining) = bucket.try_consume_remaining();

        let metrics = self.registry.metrics();
        if allowed {
            metrics.record_admitted();
            AdmissionDecision {
                allowed,
                limit: policy.requests_per_window(),
                remaining,
                retry_after_secs: 0,
            }
        } else {
            metrics.record_rejected();
            let retry_after_secs = policy.retry_after_secs();
            tracing::debug!(
                client = client_id,
                endpoint = endpoint_id,
                limit = policy.requests_per_window(),
                retry_after_secs,
                "request rejected by rate limit"
            );
            AdmissionDecision {
                allowed,
                limit: policy.requests_per_window(),
                remaining,
                retry_after_secs,
            }
        }
    }

    /// Build a reaper over this controller's registry.
    ///
    /// The reaper is not started; the caller owns its lifetime.
    pub fn reaper(&self) -> Reaper<S> {
        Reaper::new(self.registry.clone(), self.reaper_config.clone())
    }

    /// Get a reference to the registry.
    pub fn registry(&self) -> &BucketRegistry<S> {
        &self.registry
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        self.registry.metrics()
    }

    /// Get the reaper schedule.
    pub fn reaper_config(&self) -> &ReaperConfig {
        &self.reaper_config
    }

    /// Number of tracked buckets.
    pub fn bucket_count(&self) -> usize {
        self.registry.len()
    }
}

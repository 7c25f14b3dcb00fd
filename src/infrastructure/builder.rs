//! Controller construction.
//!
//! Wires the policy table, sharded storage, clock and reaper schedule into an
//! [`AdmissionController`] backed by [`DefaultStorage`].

use crate::application::{
    admission::AdmissionController,
    metrics::Metrics,
    ports::Clock,
    reaper::{ReaperConfig, ReaperConfigError},
    registry::BucketRegistry,
};
use crate::domain::policy::{EndpointPolicy, PolicyTable};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::config::ConfigError;
use crate::infrastructure::storage::{DefaultStorage, ShardedStorage};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Error returned when building an `AdmissionController` fails.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Reaper schedule validation failed
    #[error("reaper configuration error: {0}")]
    Reaper(#[from] ReaperConfigError),
    /// An endpoint override was registered under an empty id
    #[error("endpoint policy registered with an empty endpoint id")]
    EmptyEndpointId,
    /// Declarative configuration could not be applied
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Builder for constructing an `AdmissionController`.
#[derive(Debug)]
pub struct AdmissionControllerBuilder {
    default_policy: EndpointPolicy,
    endpoint_policies: Vec<(String, EndpointPolicy)>,
    clock: Option<Arc<dyn Clock>>,
    reaper_interval: Duration,
    staleness_threshold: Duration,
}

impl AdmissionControllerBuilder {
    /// Set the policy for endpoints without an override.
    pub fn with_default_policy(mut self, policy: EndpointPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Override the policy for one endpoint.
    ///
    /// Registering the same endpoint twice keeps the last policy.
    pub fn with_endpoint_policy(
        mut self,
        endpoint_id: impl Into<String>,
        policy: EndpointPolicy,
    ) -> Self {
        self.endpoint_policies.push((endpoint_id.into(), policy));
        self
    }

    /// Set a custom clock (useful for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set how often the reaper sweeps.
    pub fn with_reaper_interval(mut self, interval: Duration) -> Self {
        self.reaper_interval = interval;
        self
    }

    /// Set how long a full bucket must sit idle before it may be evicted.
    pub fn with_staleness_threshold(mut self, staleness: Duration) -> Self {
        self.staleness_threshold = staleness;
        self
    }

    /// Build the controller.
    ///
    /// The reaper is not started; call [`AdmissionController::reaper`] and
    /// [`Reaper::start`](crate::Reaper::start) from within a tokio runtime.
    ///
    /// # Errors
    /// Returns `BuildError` if the configuration is invalid.
    pub fn build(self) -> Result<AdmissionController<DefaultStorage>, BuildError> {
        let reaper_config = ReaperConfig::new(self.reaper_interval, self.staleness_threshold)?;

        let mut table = PolicyTable::new(self.default_policy);
        for (endpoint_id, policy) in self.endpoint_policies {
            if endpoint_id.is_empty() {
                return Err(BuildError::EmptyEndpointId);
            }
            table = table.with_endpoint(endpoint_id, policy);
        }

        tracing::info!(
            default_limit = table.default_policy().requests_per_window(),
            default_window_secs = table.default_policy().window().as_secs_f64(),
            endpoint_overrides = table.len(),
            "admission controller configured"
        );

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        let storage = Arc::new(ShardedStorage::new());
        let registry = BucketRegistry::new(storage, clock, table, Metrics::new());

        Ok(AdmissionController::new(registry, reaper_config))
    }
}

impl Default for AdmissionControllerBuilder {
    fn default() -> Self {
        let reaper = ReaperConfig::default();
        Self {
            default_policy: EndpointPolicy::default(),
            endpoint_policies: Vec::new(),
            clock: None,
            reaper_interval: reaper.interval(),
            staleness_threshold: reaper.staleness(),
        }
    }
}

impl AdmissionController<DefaultStorage> {
    /// Create a builder for configuring the controller.
    ///
    /// Defaults:
    /// - Default policy: 100 requests per 60 seconds
    /// - Reaper interval: 5 minutes
    /// - Staleness threshold: 10 minutes
    pub fn builder() -> AdmissionControllerBuilder {
        AdmissionControllerBuilder::default()
    }
}

impl Default for AdmissionController<DefaultStorage> {
    /// Equivalent to `AdmissionController::builder().build().unwrap()`.
    fn default() -> Self {
        Self::builder()
            .build()
            .expect("default configuration is always valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mocks::MockClock;
    use std::time::Instant;

    #[test]
    fn test_builder_defaults() {
        let controller = AdmissionController::builder().build().unwrap();

        let policies = controller.registry().policies();
        assert_eq!(policies.default_policy().requests_per_window(), 100);
        assert_eq!(policies.default_policy().window(), Duration::from_secs(60));
        assert!(policies.is_empty());
        assert_eq!(controller.reaper_config(), &ReaperConfig::default());
    }

    #[test]
    fn test_builder_overrides() {
        let clock = Arc::new(MockClock::new(Instant::now()));
        let controller = AdmissionController::builder()
            .with_default_policy(EndpointPolicy::per_second(10))
            .with_endpoint_policy("search", EndpointPolicy::per_minute(3))
            .with_clock(clock.clone())
            .with_reaper_interval(Duration::from_secs(30))
            .with_staleness_threshold(Duration::from_secs(90))
            .build()
            .unwrap();

        for _ in 0..3 {
            assert!(controller.check("X", "search").allowed);
        }
        assert!(!controller.check("X", "search").allowed);
        assert_eq!(controller.check("X", "plants").limit, 10);

        assert_eq!(controller.reaper_config().interval(), Duration::from_secs(30));
        assert_eq!(controller.reaper_config().staleness(), Duration::from_secs(90));
    }

    #[test]
    fn test_last_endpoint_override_wins() {
        let controller = AdmissionController::builder()
            .with_endpoint_policy("search", EndpointPolicy::per_minute(3))
            .with_endpoint_policy("search", EndpointPolicy::per_minute(7))
            .build()
            .unwrap();

        assert_eq!(controller.check("X", "search").limit, 7);
    }

    #[test]
    fn test_invalid_reaper_schedule() {
        let result = AdmissionController::builder()
            .with_reaper_interval(Duration::ZERO)
            .build();
        assert!(matches!(
            result,
            Err(BuildError::Reaper(ReaperConfigError::ZeroInterval))
        ));

        let result = AdmissionController::builder()
            .with_staleness_threshold(Duration::ZERO)
            .build();
        assert!(matches!(
            result,
            Err(BuildError::Reaper(ReaperConfigError::ZeroStaleness))
        ));
    }

    #[test]
    fn test_empty_endpoint_id_rejected() {
        let result = AdmissionController::builder()
            .with_endpoint_policy("", EndpointPolicy::per_minute(3))
            .build();
        assert!(matches!(result, Err(BuildError::EmptyEndpointId)));
    }

    #[test]
    fn test_default_controller() {
        let controller = AdmissionController::default();
        assert_eq!(controller.bucket_count(), 0);
        assert!(controller.check("X", "plants").allowed);
        assert_eq!(controller.bucket_count(), 1);
    }
}

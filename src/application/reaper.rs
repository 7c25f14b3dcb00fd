//! Background eviction of idle buckets.
//!
//! The reaper periodically sweeps the registry and drops buckets that are
//! full and have not been touched for longer than the staleness threshold.
//! This bounds memory as new clients appear without ever resetting a client
//! that is partway through its window.

use crate::application::ports::Storage;
use crate::application::registry::{BucketRegistry, SharedBucket};
use crate::domain::key::BucketKey;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Error returned when reaper configuration validation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReaperConfigError {
    /// Sweep interval must be greater than zero
    #[error("reaper interval must be greater than 0")]
    ZeroInterval,
    /// Staleness threshold must be greater than zero
    #[error("staleness threshold must be greater than 0")]
    ZeroStaleness,
}

/// Error returned when stopping the reaper task fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ShutdownError {
    /// The task panicked before it could be stopped
    #[error("reaper task panicked")]
    Panicked,
    /// The task was cancelled by the runtime
    #[error("reaper task was cancelled")]
    Cancelled,
}

/// Reaper schedule.
///
/// Only constructible through [`ReaperConfig::new`] or `Default`, so both
/// durations are always non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaperConfig {
    interval: Duration,
    staleness: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5 * 60),
            staleness: Duration::from_secs(10 * 60),
        }
    }
}

impl ReaperConfig {
    /// Create a reaper schedule.
    ///
    /// # Errors
    /// Returns `ReaperConfigError` if either duration is zero.
    pub fn new(interval: Duration, staleness: Duration) -> Result<Self, ReaperConfigError> {
        if interval.is_zero() {
            return Err(ReaperConfigError::ZeroInterval);
        }
        if staleness.is_zero() {
            return Err(ReaperConfigError::ZeroStaleness);
        }
        Ok(Self {
            interval,
            staleness,
        })
    }

    /// How often to sweep.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Minimum idle time before a full bucket may be evicted.
    pub fn staleness(&self) -> Duration {
        self.staleness
    }
}

/// Sweeps stale buckets out of a registry.
pub struct Reaper<S>
where
    S: Storage<BucketKey, Arc<SharedBucket>> + Clone,
{
    registry: BucketRegistry<S>,
    config: ReaperConfig,
}

impl<S> Reaper<S>
where
    S: Storage<BucketKey, Arc<SharedBucket>> + Clone,
{
    /// Create a reaper for `registry`.
    pub fn new(registry: BucketRegistry<S>, config: ReaperConfig) -> Self {
        Self { registry, config }
    }

    /// Run one sweep now.
    ///
    /// # Returns
    /// Number of buckets evicted.
    pub fn sweep_now(&self) -> usize {
        let evicted = self.registry.sweep(self.config.staleness());
        if evicted > 0 {
            tracing::info!(
                evicted,
                remaining = self.registry.len(),
                "reaper evicted idle rate limit buckets"
            );
        }
        evicted
    }

    /// Start sweeping on a background task.
    ///
    /// Must be called from within a tokio runtime. The first sweep happens
    /// one interval after start. The task runs until
    /// [`ReaperHandle::shutdown`] is called; dropping the handle does not
    /// stop it.
    pub fn start(self) -> ReaperHandle
    where
        S: Send + 'static,
    {
        let stop = Arc::new(Notify::new());
        let stop_signal = Arc::clone(&stop);

        tracing::info!(
            interval_secs = self.config.interval.as_secs_f64(),
            staleness_secs = self.config.staleness.as_secs_f64(),
            "reaper started"
        );

        let task = tokio::spawn(async move {
            let mut ticker = interval(self.config.interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep_now();
                    }
                    _ = stop_signal.notified() => break,
                }
            }

            tracing::info!("reaper stopped");
        });

        ReaperHandle { stop, task }
    }

    /// Get the reaper schedule.
    pub fn config(&self) -> &ReaperConfig {
        &self.config
    }

    /// Get a reference to the registry.
    pub fn registry(&self) -> &BucketRegistry<S> {
        &self.registry
    }
}

/// Owner handle for a running reaper task.
#[derive(Debug)]
pub struct ReaperHandle {
    stop: Arc<Notify>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Stop the reaper and wait for its task to finish.
    ///
    /// # Errors
    /// Returns `ShutdownError` if the task panicked or was cancelled.
    pub async fn shutdown(self) -> Result<(), ShutdownError> {
        // notify_one stores a permit if the task is mid-sweep
        self.stop.notify_one();
        self.task.await.map_err(|e| {
            if e.is_panic() {
                ShutdownError::Panicked
            } else {
                ShutdownError::Cancelled
            }
        })
    }

    /// Whether the background task is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

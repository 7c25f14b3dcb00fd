//! # gateway-admission
//!
//! Per-client, per-endpoint token-bucket admission control for an HTTP gateway.
//!
//! Every `(client, endpoint)` pair gets its own token bucket. A bucket starts
//! full, refills continuously at `requests / window` tokens per second and
//! admits a request by taking one whole token. When the bucket is empty the
//! request is rejected with `429 Too Many Requests` and a `Retry-After` hint.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axum::{middleware, routing::get, Router};
//! use gateway_admission::{admit, AdmissionController, EndpointPolicy};
//! use std::time::Duration;
//!
//! # async fn run() {
//! let controller = AdmissionController::builder()
//!     .with_default_policy(EndpointPolicy::per_minute(100))
//!     .with_endpoint_policy("/search", EndpointPolicy::per_minute(3))
//!     .with_staleness_threshold(Duration::from_secs(600))
//!     .build()
//!     .unwrap();
//!
//! // The reaper bounds memory by dropping idle, fully refilled buckets
//! let reaper = controller.reaper().start();
//!
//! let app: Router = Router::new()
//!     .route("/search", get(|| async { "results" }))
//!     .route_layer(middleware::from_fn_with_state(controller, admit));
//!
//! // ... serve `app` ...
//!
//! reaper.shutdown().await.unwrap();
//! # }
//! ```
//!
//! ## Identifying Clients and Endpoints
//!
//! The middleware identifies the caller by the left-most `X-Forwarded-For`
//! entry, then `X-Real-IP`, then the peer address (when the server is run
//! with `into_make_service_with_connect_info::<SocketAddr>()`).
//!
//! The endpoint id is an explicit [`Endpoint`] request extension if present,
//! otherwise the matched route template (`/plants/:id`), otherwise the raw
//! path. Policies in the table are keyed by that id.
//!
//! ## Policies
//!
//! A policy of `N` requests per window `W` gives a bucket of capacity `N`
//! refilling at `N / W` tokens per second. Bursts up to `N` are admitted at
//! once; afterwards the client is held to the average rate.
//!
//! ```rust
//! use gateway_admission::EndpointPolicy;
//!
//! let search = EndpointPolicy::per_minute(3);
//! assert_eq!(search.capacity(), 3.0);
//! assert_eq!(search.retry_after_secs(), 20);
//! ```
//!
//! Policies can also be loaded from TOML with [`AdmissionConfig`].
//!
//! ## Eviction
//!
//! Buckets are created on first use and removed by the reaper once they are
//! full again and have been idle for longer than the staleness threshold.
//! Removing a full bucket is indistinguishable from keeping it, so eviction
//! never grants or takes away tokens.
//!
//! ## Observability
//!
//! ```rust,no_run
//! # use gateway_admission::AdmissionController;
//! # let controller = AdmissionController::default();
//! let snapshot = controller.metrics().snapshot();
//! println!("Rejection rate: {:.2}%", snapshot.rejection_rate() * 100.0);
//! println!("Live buckets: {}", controller.bucket_count());
//! ```
//!
//! The crate logs through `tracing` and never installs a subscriber.

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    bucket::TokenBucket,
    decision::AdmissionDecision,
    key::BucketKey,
    policy::{EndpointPolicy, PolicyError, PolicyTable},
};

pub use application::{
    admission::AdmissionController,
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, Storage},
    reaper::{Reaper, ReaperConfig, ReaperConfigError, ReaperHandle, ShutdownError},
    registry::{BucketRegistry, SharedBucket},
};

pub use infrastructure::{
    builder::{AdmissionControllerBuilder, BuildError},
    clock::SystemClock,
    config::{AdmissionConfig, ConfigError, PolicyConfig, ReaperSection},
    middleware::{admit, client_id, endpoint_id, Endpoint, X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING},
    storage::{DefaultStorage, ShardedStorage},
};

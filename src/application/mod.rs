//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages the runtime behavior:
//! - Bucket registry (one shared bucket per client and endpoint)
//! - Admission controller (decision making)
//! - Reaper (periodic eviction of idle buckets)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod admission;
pub mod metrics;
pub mod ports;
pub mod reaper;
pub mod registry;

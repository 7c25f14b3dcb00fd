//! Domain layer - pure business logic with no external dependencies.
//!
//! This layer contains the core concepts and invariants of admission control:
//! - Token bucket arithmetic (lazy refill, consume)
//! - Endpoint policies and the policy table
//! - Bucket keys and admission decisions
//!
//! All types in this layer are pure and take time as an argument, so they are
//! easily testable.

pub mod bucket;
pub mod decision;
pub mod key;
pub mod policy;

//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Logical call:
//!     → retries.rs (attempt/elapsed budget, cancellation, optional backoff)
//!     → per attempt, on the selected instance:
//!         → rate_limit.rs (token bucket, fail fast when empty)
//!         → circuit_breaker.rs (reject while open, single half-open trial)
//!         → network endpoint
//! ```
//!
//! # Design Decisions
//! - Breaker and limiter state is per instance, never shared
//! - Local rejections cost no network call and are retried elsewhere
//! - All resilience logic is composable endpoint middleware

pub mod backoff;
pub mod circuit_breaker;
pub mod rate_limit;
pub mod retries;

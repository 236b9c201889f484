//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Configured instance URLs (fixed, no discovery)
//!     → pool.rs (build limiter → breaker → endpoint per instance)
//!     → Apply load balancing algorithm:
//!         - round_robin.rs (rotate through instances)
//!     → instance.rs (the selected instance's wrapped endpoint)
//!     → Retry orchestrator calls it, asking again on failure
//! ```
//!
//! # Design Decisions
//! - Load balancer holds only a cursor; instances own their breaker/limiter state
//! - Unhealthy instances stay selectable; their breaker rejects locally
//! - Pool is immutable after construction

pub mod instance;
pub mod pool;
pub mod round_robin;

pub use instance::Instance;
pub use pool::{InstancePool, PoolError};
pub use round_robin::RoundRobin;

/// Strategy choosing an index into a pool of `len` instances.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    fn next_index(&self, len: usize) -> Option<usize>;
}

//! String service subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP handler
//!     → instrument.rs (count + latency per method)
//!     → logging.rs (one event per call)
//!     → proxy.rs (hello → retry → balancer → instance, when instances are configured)
//!     → local.rs (reverse always; hello in local-only mode)
//! ```
//!
//! # Design Decisions
//! - Every middleware holds its delegate and forwards each operation it
//!   does not override explicitly
//! - Callers cannot tell a proxied call from a local one

pub mod instrument;
pub mod local;
pub mod logging;
pub mod proxy;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::endpoint::{CallContext, CallResult};

pub use instrument::InstrumentedStringService;
pub use local::LocalStringService;
pub use logging::LoggingStringService;
pub use proxy::{make_proxy, ProxyBuildError, ProxyStringService};

/// Operations offered by the string service.
#[async_trait]
pub trait StringService: Send + Sync {
    /// Reverse `value` by Unicode scalar values.
    fn reverse(&self, value: &str) -> String;

    /// Produce a greeting. May be served by a remote instance.
    async fn hello(&self, ctx: &CallContext) -> CallResult<String>;
}

/// Shared handle to any layer of the service stack.
pub type SharedStringService = Arc<dyn StringService>;

/// Body of a reversal request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseRequest {
    pub value: String,
}

/// Body of a reversal response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseResponse {
    pub result: String,
}

/// Body of a greeting response, both served and consumed from instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloResponse {
    pub result: String,
}

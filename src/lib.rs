//! Resilient string service with a remote-call proxy.

pub mod config;
pub mod endpoint;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod resilience;
pub mod service;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use service::{make_proxy, SharedStringService, StringService};

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! .env file (skipped when GO_ENV=production)
//!     → process environment
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides: PORT, TEST_URL, NAME, ...)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → handed to the proxy pipeline at construction time
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the proxy pipeline is built once from it
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_dotenv, load_from_env, ConfigError};
pub use schema::{
    CircuitBreakerConfig, ListenerConfig, LogFormat, ObservabilityConfig, ProxyConfig,
    RateLimitConfig, ResilienceConfig, RetryConfig, ServiceConfig, TimeoutConfig,
};

//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds, budgets and bursts > 0)
//! - Check that the bind address and instance URLs parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::service::proxy::parse_instances;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("invalid instance list: {0}")]
    Instances(String),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),
}

/// Validate a parsed configuration, collecting every error found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let resilience = &config.resilience;
    let positive = [
        ("circuit_breaker.failure_threshold", resilience.circuit_breaker.failure_threshold as u64),
        ("rate_limit.interval_ms", resilience.rate_limit.interval_ms),
        ("rate_limit.burst_size", resilience.rate_limit.burst_size as u64),
        ("retries.max_attempts", resilience.retries.max_attempts as u64),
        ("retries.max_elapsed_ms", resilience.retries.max_elapsed_ms),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.remote_call_ms", config.timeouts.remote_call_ms),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    if let Some(instances) = config.service.instances.as_deref() {
        if let Err(e) = parse_instances(instances) {
            errors.push(ValidationError::Instances(e.to_string()));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define service and resilience metrics
//! - Expose Prometheus-compatible metrics endpoint
//! - Track per-instance breaker and limiter activity
//!
//! # Metrics
//! - `string_service_requests_total` (counter): calls by method
//! - `string_service_request_duration_seconds` (histogram): latency by method
//! - `proxy_breaker_transitions_total` (counter): by instance, new state
//! - `proxy_rate_limited_total` (counter): limiter rejections by instance
//! - `proxy_retries_total` (counter): attempts beyond the first
//! - `proxy_retries_exhausted_total` (counter): calls that ran out of budget
//!
//! # Design Decisions
//! - Without an installed recorder every call is a no-op
//! - Labels for method and instance only

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and serve it on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_service_call(method: &'static str, start: Instant) {
    counter!("string_service_requests_total", "method" => method).increment(1);
    histogram!("string_service_request_duration_seconds", "method" => method)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_breaker_transition(instance: &str, state: &'static str) {
    counter!(
        "proxy_breaker_transitions_total",
        "instance" => instance.to_string(),
        "state" => state
    )
    .increment(1);
}

pub fn record_rate_limited(instance: &str) {
    counter!("proxy_rate_limited_total", "instance" => instance.to_string()).increment(1);
}

pub fn record_retry() {
    counter!("proxy_retries_total").increment(1);
}

pub fn record_retries_exhausted() {
    counter!("proxy_retries_exhausted_total").increment(1);
}

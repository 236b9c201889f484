//! Instance abstraction.
//!
//! # Responsibilities
//! - Represent a single remote replica (immutable base URL)
//! - Own the fully wrapped endpoint for that replica
//! - Expose its breaker and limiter for inspection

use std::sync::Arc;

use url::Url;

use crate::endpoint::BoxEndpoint;
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::rate_limit::RateLimiter;

/// A single remote instance with its resilience state.
pub struct Instance<Req, Resp> {
    url: Url,
    endpoint: BoxEndpoint<Req, Resp>,
    breaker: Arc<CircuitBreaker>,
    limiter: Arc<RateLimiter>,
}

impl<Req, Resp> Instance<Req, Resp> {
    pub(crate) fn new(
        url: Url,
        endpoint: BoxEndpoint<Req, Resp>,
        breaker: Arc<CircuitBreaker>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            url,
            endpoint,
            breaker,
            limiter,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The limiter → breaker → network endpoint chain for this instance.
    pub fn endpoint(&self) -> &BoxEndpoint<Req, Resp> {
        &self.endpoint
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

impl<Req, Resp> std::fmt::Debug for Instance<Req, Resp> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("url", &self.url.as_str())
            .field("breaker", &self.breaker.state())
            .finish()
    }
}

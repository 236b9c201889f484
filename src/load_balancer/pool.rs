//! Instance pool management.
//!
//! # Responsibilities
//! - Build one wrapped endpoint per configured instance
//! - Apply the load balancing algorithm to select an instance per call
//!
//! # Wrapping order
//! ```text
//! RateLimitEndpoint → BreakerEndpoint → network endpoint
//! ```
//! The limiter sits outside the breaker so its fail-fast rejections never
//! count against the instance's health.

use std::sync::Arc;

use thiserror::Error;
use url::Url;

use crate::config::ResilienceConfig;
use crate::endpoint::BoxEndpoint;
use crate::load_balancer::{instance::Instance, round_robin::RoundRobin, LoadBalancer};
use crate::resilience::circuit_breaker::{BreakerEndpoint, CircuitBreaker};
use crate::resilience::rate_limit::{RateLimitEndpoint, RateLimiter};

/// Error type for pool construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("instance pool needs at least one instance")]
    Empty,

    #[error("cannot build endpoint for {instance}: {reason}")]
    Endpoint { instance: String, reason: String },
}

/// The fixed set of resilient endpoints plus the balancer choosing among them.
pub struct InstancePool<Req, Resp> {
    instances: Vec<Instance<Req, Resp>>,
    balancer: Box<dyn LoadBalancer>,
}

impl<Req, Resp> InstancePool<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    /// Build the pool with round-robin selection.
    ///
    /// `make_endpoint` produces the raw network endpoint for each URL; this
    /// function adds the breaker and limiter around it. The first factory
    /// error aborts construction.
    pub fn build<F>(urls: Vec<Url>, config: &ResilienceConfig, make_endpoint: F) -> Result<Self, PoolError>
    where
        F: FnMut(&Url) -> Result<BoxEndpoint<Req, Resp>, PoolError>,
    {
        Self::with_balancer(urls, config, Box::new(RoundRobin::new()), make_endpoint)
    }

    pub fn with_balancer<F>(
        urls: Vec<Url>,
        config: &ResilienceConfig,
        balancer: Box<dyn LoadBalancer>,
        mut make_endpoint: F,
    ) -> Result<Self, PoolError>
    where
        F: FnMut(&Url) -> Result<BoxEndpoint<Req, Resp>, PoolError>,
    {
        if urls.is_empty() {
            return Err(PoolError::Empty);
        }

        let instances = urls
            .into_iter()
            .map(|url| -> Result<Instance<Req, Resp>, PoolError> {
                let name = url.as_str().trim_end_matches('/').to_string();
                let breaker = Arc::new(CircuitBreaker::new(name.clone(), &config.circuit_breaker));
                let limiter = Arc::new(RateLimiter::new(name, &config.rate_limit));

                let raw = make_endpoint(&url)?;
                let guarded = BreakerEndpoint::new(raw, breaker.clone());
                let limited: BoxEndpoint<Req, Resp> =
                    Arc::new(RateLimitEndpoint::new(guarded, limiter.clone()));

                tracing::debug!(instance = %url, "Instance added to pool");
                Ok(Instance::new(url, limited, breaker, limiter))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { instances, balancer })
    }
}

impl<Req, Resp> InstancePool<Req, Resp> {
    /// Select the instance for the next attempt.
    pub fn select(&self) -> Option<(usize, &Instance<Req, Resp>)> {
        let index = self.balancer.next_index(self.instances.len())?;
        self.instances.get(index).map(|instance| (index, instance))
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn instances(&self) -> &[Instance<Req, Resp>] {
        &self.instances
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{CallContext, CallError, Endpoint, FnEndpoint};
    use crate::resilience::circuit_breaker::CircuitState;

    fn urls(n: usize) -> Vec<Url> {
        (0..n)
            .map(|i| Url::parse(&format!("http://10.0.0.{}:8080/", i + 1)).unwrap())
            .collect()
    }

    fn echo_url(url: &Url) -> Result<BoxEndpoint<(), String>, PoolError> {
        let name = url.to_string();
        Ok(Arc::new(FnEndpoint::new(move |_ctx: CallContext, _req: ()| {
            let name = name.clone();
            async move { Ok(name) }
        })))
    }

    #[test]
    fn test_factory_error_aborts_build() {
        let result = InstancePool::<(), String>::build(urls(2), &ResilienceConfig::default(), |url| {
            Err(PoolError::Endpoint {
                instance: url.to_string(),
                reason: "unsupported".into(),
            })
        });
        assert!(matches!(result, Err(PoolError::Endpoint { .. })));
    }

    #[test]
    fn test_empty_pool_is_rejected() {
        let result = InstancePool::build(Vec::new(), &ResilienceConfig::default(), echo_url);
        assert_eq!(result.err(), Some(PoolError::Empty));
    }

    #[tokio::test]
    async fn test_round_robin_fairness() {
        let mut config = ResilienceConfig::default();
        config.rate_limit.interval_ms = 1;
        config.rate_limit.burst_size = 100;
        let pool = InstancePool::build(urls(3), &config, echo_url).unwrap();
        let ctx = CallContext::new();

        let mut seen = Vec::new();
        for _ in 0..9 {
            let (_, instance) = pool.select().unwrap();
            seen.push(instance.endpoint().call(&ctx, ()).await.unwrap());
        }

        let expected: Vec<String> = urls(3).iter().map(Url::to_string).cycle().take(9).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn test_limiter_rejection_leaves_breaker_closed() {
        let mut config = ResilienceConfig::default();
        config.rate_limit.interval_ms = 60_000;
        config.rate_limit.burst_size = 1;
        config.circuit_breaker.failure_threshold = 1;
        let pool = InstancePool::build(urls(1), &config, echo_url).unwrap();
        let instance = &pool.instances()[0];
        let ctx = CallContext::new();

        assert!(instance.endpoint().call(&ctx, ()).await.is_ok());
        for _ in 0..3 {
            let err = instance.endpoint().call(&ctx, ()).await.unwrap_err();
            assert!(matches!(err, CallError::RateLimited { .. }));
        }
        assert_eq!(instance.breaker().state(), CircuitState::Closed);
        assert_eq!(instance.limiter().available(), 0);
    }
}

//! Per-instance rate limiting.
//!
//! A token bucket in front of each instance. Calls that find the bucket empty
//! fail immediately with `CallError::RateLimited`; nothing is queued or delayed.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::endpoint::{CallContext, CallError, CallResult, Endpoint};
use crate::observability::metrics;

/// A token bucket measured in refill time.
///
/// `budget` is the accumulated refill time; one token costs `interval`.
/// Working in `Duration` keeps the arithmetic exact: after exactly one
/// interval an empty bucket holds exactly one token.
#[derive(Debug)]
struct TokenBucket {
    budget: Duration,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: Duration) -> Self {
        Self {
            budget: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: Duration, interval: Duration) -> bool {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_update);

        // Refill tokens
        self.budget = self.budget.saturating_add(elapsed).min(capacity);
        self.last_update = now;

        if self.budget >= interval {
            self.budget -= interval;
            true
        } else {
            false
        }
    }

    fn tokens(&self, interval: Duration) -> u32 {
        (self.budget.as_nanos() / interval.as_nanos().max(1)) as u32
    }
}

/// Fail-fast admission control for one instance.
#[derive(Debug)]
pub struct RateLimiter {
    instance: String,
    interval: Duration,
    capacity: Duration,
    bucket: Mutex<TokenBucket>,
}

impl RateLimiter {
    pub fn new(instance: impl Into<String>, config: &RateLimitConfig) -> Self {
        let interval = config.interval().max(Duration::from_nanos(1));
        let capacity = interval.saturating_mul(config.burst_size.max(1));
        Self {
            instance: instance.into(),
            interval,
            capacity,
            bucket: Mutex::new(TokenBucket::new(capacity)),
        }
    }

    /// Take one token if available.
    pub fn try_acquire(&self) -> bool {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        bucket.try_acquire(self.capacity, self.interval)
    }

    /// Whole tokens currently available (without refilling).
    pub fn available(&self) -> u32 {
        let bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        bucket.tokens(self.interval)
    }
}

/// Endpoint guarded by a rate limiter.
pub struct RateLimitEndpoint<E> {
    inner: E,
    limiter: Arc<RateLimiter>,
}

impl<E> RateLimitEndpoint<E> {
    pub fn new(inner: E, limiter: Arc<RateLimiter>) -> Self {
        Self { inner, limiter }
    }
}

#[async_trait]
impl<E, Req, Resp> Endpoint<Req, Resp> for RateLimitEndpoint<E>
where
    E: Endpoint<Req, Resp>,
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn call(&self, ctx: &CallContext, request: Req) -> CallResult<Resp> {
        if !self.limiter.try_acquire() {
            tracing::debug!(instance = %self.limiter.instance, "Rate limit exceeded");
            metrics::record_rate_limited(&self.limiter.instance);
            return Err(CallError::RateLimited {
                instance: self.limiter.instance.clone(),
            });
        }
        self.inner.call(ctx, request).await
    }
}

//! Retry orchestration over the load-balanced instance pool.
//!
//! # Responsibilities
//! - Send each attempt to the instance the balancer picks next
//! - Bound a logical call by attempt count and elapsed time
//! - Stop immediately when the caller's context is canceled
//!
//! # Design Decisions
//! - Attempts are sequential, never fanned out
//! - Breaker, limiter and downstream errors are retry signals; they only
//!   surface wrapped in `RetriesExhausted`
//! - The elapsed budget also bounds the in-flight attempt; an attempt cut
//!   short by it counts against the instance's breaker
//! - No delay between attempts unless backoff is configured

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::config::RetryConfig;
use crate::endpoint::{CallContext, CallError, CallResult, Endpoint};
use crate::load_balancer::pool::InstancePool;
use crate::observability::metrics;
use crate::resilience::backoff::Backoff;

/// Retry policy for one logical call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub max_elapsed: Duration,
    pub allow_same_instance: bool,
    pub backoff: Backoff,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            max_elapsed: config.max_elapsed(),
            allow_same_instance: config.allow_same_instance,
            backoff: Backoff::from_config(config),
        }
    }
}

/// Endpoint that retries failed calls against the balanced pool.
pub struct Retry<Req, Resp> {
    pool: Arc<InstancePool<Req, Resp>>,
    policy: RetryPolicy,
}

impl<Req, Resp> Retry<Req, Resp> {
    pub fn new(pool: Arc<InstancePool<Req, Resp>>, policy: RetryPolicy) -> Self {
        Self { pool, policy }
    }

    pub fn pool(&self) -> &Arc<InstancePool<Req, Resp>> {
        &self.pool
    }
}

#[async_trait]
impl<Req, Resp> Endpoint<Req, Resp> for Retry<Req, Resp>
where
    Req: Clone + Send + Sync + 'static,
    Resp: Send + 'static,
{
    async fn call(&self, ctx: &CallContext, request: Req) -> CallResult<Resp> {
        let deadline = Instant::now() + self.policy.max_elapsed;
        let attempt_ctx = ctx.child_with_deadline(deadline);
        let mut attempts: u32 = 0;
        let mut tried: Vec<usize> = Vec::new();
        let mut last_error = None;

        loop {
            if ctx.is_done() {
                return Err(CallError::Canceled);
            }

            let Some((index, instance)) = self.pool.select() else {
                break;
            };
            if !self.policy.allow_same_instance && tried.contains(&index) {
                tracing::debug!(
                    instance = %instance.url(),
                    "Balancer returned an instance already tried, giving up"
                );
                break;
            }
            tried.push(index);
            attempts += 1;

            // The instance's breaker enforces the attempt deadline.
            let result = instance.endpoint().call(&attempt_ctx, request.clone()).await;
            match result {
                Ok(response) => return Ok(response),
                Err(CallError::Canceled | CallError::DeadlineExceeded) if ctx.is_done() => {
                    return Err(CallError::Canceled)
                }
                Err(e) => {
                    tracing::info!(
                        instance = %instance.url(),
                        attempt = attempts,
                        error = %e,
                        "Attempt failed"
                    );
                    last_error = Some(e);
                }
            }

            if attempts >= self.policy.max_attempts || Instant::now() >= deadline {
                break;
            }

            let delay = self.policy.backoff.delay(attempts);
            if !delay.is_zero() {
                let waited = attempt_ctx
                    .run(async {
                        tokio::time::sleep(delay).await;
                        Ok(())
                    })
                    .await;
                match waited {
                    Ok(()) => {}
                    Err(_) if ctx.is_done() => return Err(CallError::Canceled),
                    Err(_) => break,
                }
            }
            metrics::record_retry();
        }

        let last = last_error
            .unwrap_or_else(|| CallError::downstream("pool", "no instance available"));
        tracing::warn!(attempts, error = %last, "Retries exhausted");
        metrics::record_retries_exhausted();

        Err(CallError::RetriesExhausted {
            attempts,
            last: Box::new(last),
        })
    }
}

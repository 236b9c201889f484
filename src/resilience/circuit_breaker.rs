//! Circuit breaker for instance protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: instance assumed down, requests fail fast
//! - Half-Open: testing if instance recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= failure_threshold
//! Open → Half-Open: after cooldown
//! Half-Open → Closed: trial request succeeds
//! Half-Open → Open: trial request fails (cooldown restarts)
//! ```
//!
//! # Design Decisions
//! - Per-instance circuit breaker (not global)
//! - Fail fast in Open state (no waiting for timeout)
//! - Single trial in Half-Open (prevents hammering recovering instance)
//! - Downstream errors and expired deadlines count as failures; a canceled
//!   call just frees its trial slot

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::endpoint::{CallContext, CallError, CallResult, Endpoint};
use crate::observability::metrics;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

/// Health gate for one instance.
#[derive(Debug)]
pub struct CircuitBreaker {
    instance: String,
    failure_threshold: u32,
    cooldown: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(instance: impl Into<String>, config: &CircuitBreakerConfig) -> Self {
        Self {
            instance: instance.into(),
            failure_threshold: config.failure_threshold.max(1),
            cooldown: config.cooldown(),
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Current state, accounting for an elapsed cooldown.
    pub fn state(&self) -> CircuitState {
        let inner = self.lock();
        match inner.state {
            CircuitState::Open if self.cooldown_elapsed(&inner) => CircuitState::HalfOpen,
            state => state,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    /// Ask permission to call the instance.
    ///
    /// The returned permit must be resolved with `success` or `failure`;
    /// dropping it unresolved releases a half-open trial slot untouched.
    pub fn try_acquire(&self) -> Result<BreakerPermit<'_>, CallError> {
        let mut inner = self.lock();
        let trial = match inner.state {
            CircuitState::Closed => false,
            CircuitState::Open if self.cooldown_elapsed(&inner) => {
                self.transition(&mut inner, CircuitState::HalfOpen);
                inner.trial_in_flight = true;
                true
            }
            CircuitState::HalfOpen if !inner.trial_in_flight => {
                inner.trial_in_flight = true;
                true
            }
            CircuitState::Open | CircuitState::HalfOpen => {
                return Err(CallError::BreakerOpen {
                    instance: self.instance.clone(),
                });
            }
        };

        Ok(BreakerPermit {
            breaker: self,
            trial,
            resolved: false,
        })
    }

    fn on_success(&self, trial: bool) {
        let mut inner = self.lock();
        inner.consecutive_failures = 0;
        if trial {
            inner.trial_in_flight = false;
            if inner.state == CircuitState::HalfOpen {
                inner.opened_at = None;
                self.transition(&mut inner, CircuitState::Closed);
            }
        }
    }

    fn on_failure(&self, trial: bool) {
        let mut inner = self.lock();
        if trial {
            inner.trial_in_flight = false;
            if inner.state == CircuitState::HalfOpen {
                inner.opened_at = Some(Instant::now());
                self.transition(&mut inner, CircuitState::Open);
            }
            return;
        }

        if inner.state != CircuitState::Closed {
            return;
        }

        inner.consecutive_failures += 1;
        if inner.consecutive_failures >= self.failure_threshold {
            inner.opened_at = Some(Instant::now());
            self.transition(&mut inner, CircuitState::Open);
        }
    }

    fn on_abandon(&self, trial: bool) {
        if trial {
            self.lock().trial_in_flight = false;
        }
    }

    fn cooldown_elapsed(&self, inner: &BreakerInner) -> bool {
        inner
            .opened_at
            .map_or(true, |opened| opened.elapsed() >= self.cooldown)
    }

    fn transition(&self, inner: &mut BreakerInner, to: CircuitState) {
        if inner.state == to {
            return;
        }
        tracing::warn!(
            instance = %self.instance,
            from = inner.state.as_str(),
            to = to.as_str(),
            failures = inner.consecutive_failures,
            "Circuit breaker state change"
        );
        if to == CircuitState::Closed {
            inner.consecutive_failures = 0;
        }
        inner.state = to;
        metrics::record_breaker_transition(&self.instance, to.as_str());
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Admission granted by [`CircuitBreaker::try_acquire`].
#[derive(Debug)]
pub struct BreakerPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    resolved: bool,
}

impl BreakerPermit<'_> {
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn success(mut self) {
        self.resolved = true;
        self.breaker.on_success(self.trial);
    }

    pub fn failure(mut self) {
        self.resolved = true;
        self.breaker.on_failure(self.trial);
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            self.breaker.on_abandon(self.trial);
        }
    }
}

/// Endpoint guarded by a circuit breaker.
pub struct BreakerEndpoint<E> {
    inner: E,
    breaker: std::sync::Arc<CircuitBreaker>,
}

impl<E> BreakerEndpoint<E> {
    pub fn new(inner: E, breaker: std::sync::Arc<CircuitBreaker>) -> Self {
        Self { inner, breaker }
    }
}

#[async_trait]
impl<E, Req, Resp> Endpoint<Req, Resp> for BreakerEndpoint<E>
where
    E: Endpoint<Req, Resp>,
    Req: Send + 'static,
    Resp: Send + 'static,
{
    async fn call(&self, ctx: &CallContext, request: Req) -> CallResult<Resp> {
        let permit = self.breaker.try_acquire()?;

        // An expired deadline is charged to the instance; only a caller
        // cancel releases the permit untouched.
        let result = ctx.run(self.inner.call(ctx, request)).await;
        match &result {
            Ok(_) => permit.success(),
            Err(CallError::Downstream { .. } | CallError::DeadlineExceeded) => permit.failure(),
            Err(_) => drop(permit),
        }
        result
    }
}

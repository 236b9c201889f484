//! Call context and error definitions shared by every endpoint layer.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Errors produced while calling an endpoint.
///
/// `BreakerOpen`, `RateLimited` and `Downstream` are retry signals that the
/// retry orchestrator absorbs. Only `RetriesExhausted` and `Canceled` leave
/// the proxy pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// The instance's breaker is open; no network call was made.
    #[error("circuit breaker open for {instance}")]
    BreakerOpen { instance: String },

    /// The instance's token bucket is empty; no network call was made.
    #[error("rate limit exceeded for {instance}")]
    RateLimited { instance: String },

    /// The instance was reached (or tried) and the call failed.
    #[error("downstream error from {instance}: {reason}")]
    Downstream { instance: String, reason: String },

    /// Attempt or elapsed-time budget spent without a success.
    #[error("retries exhausted after {attempts} attempt(s): {last}")]
    RetriesExhausted { attempts: u32, last: Box<CallError> },

    /// The attempt's deadline passed before the instance answered.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The caller's context was canceled or its deadline passed.
    #[error("call canceled")]
    Canceled,
}

impl CallError {
    pub fn downstream(instance: impl Into<String>, reason: impl ToString) -> Self {
        CallError::Downstream {
            instance: instance.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors the retry orchestrator may recover from.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CallError::BreakerOpen { .. }
                | CallError::RateLimited { .. }
                | CallError::Downstream { .. }
                | CallError::DeadlineExceeded
        )
    }
}

/// Result type for endpoint calls.
pub type CallResult<T> = Result<T, CallError>;

/// Cancellation and deadline carried along one logical call.
///
/// Cloning shares the cancellation signal. `child_with_deadline` derives a
/// context that is canceled with its parent but may expire earlier.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Derive a context canceled with this one and expiring no later than `deadline`.
    pub fn child_with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        };
        Self {
            cancel: self.cancel.child_token(),
            deadline: Some(deadline),
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True once canceled or past the deadline.
    pub fn is_done(&self) -> bool {
        self.is_cancelled() || self.is_expired()
    }

    /// True once canceled explicitly, by this context or a parent.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// True once the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Cancel this context when the returned guard is dropped.
    ///
    /// Tie it to the lifetime of the inbound request so a dropped request
    /// aborts whatever remote call it started.
    pub fn cancel_on_drop(&self) -> DropGuard {
        self.cancel.clone().drop_guard()
    }

    /// Drive `fut` until it completes, the context is canceled, or the deadline passes.
    ///
    /// Cancellation ends with `Canceled`, an expired deadline with
    /// `DeadlineExceeded`.
    pub async fn run<F, T>(&self, fut: F) -> CallResult<T>
    where
        F: Future<Output = CallResult<T>>,
    {
        if self.is_cancelled() {
            return Err(CallError::Canceled);
        }
        if self.is_expired() {
            return Err(CallError::DeadlineExceeded);
        }

        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CallError::Canceled),
            _ = expired => Err(CallError::DeadlineExceeded),
            result = fut => result,
        }
    }
}

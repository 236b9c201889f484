//! Endpoint subsystem.
//!
//! # Data Flow
//! ```text
//! (CallContext, request)
//!     → Endpoint::call
//!         → http.rs (one network round-trip to one instance)
//!     → response | CallError
//! ```
//!
//! # Design Decisions
//! - An endpoint is the atomic remote-call unit; breakers, limiters and
//!   retries are separate endpoints wrapping an inner one
//! - The outbound HTTP client is injected, never global
//! - Every call honours the context's cancellation and deadline

pub mod http;
pub mod types;

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

pub use http::HttpEndpoint;
pub use types::{CallContext, CallError, CallResult};

/// A callable unit: takes a request and a call context, returns a response or fails.
#[async_trait]
pub trait Endpoint<Req, Resp>: Send + Sync {
    async fn call(&self, ctx: &CallContext, request: Req) -> CallResult<Resp>;
}

/// Shared, type-erased endpoint.
pub type BoxEndpoint<Req, Resp> = Arc<dyn Endpoint<Req, Resp>>;

#[async_trait]
impl<Req, Resp, E> Endpoint<Req, Resp> for Arc<E>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    E: Endpoint<Req, Resp> + ?Sized,
{
    async fn call(&self, ctx: &CallContext, request: Req) -> CallResult<Resp> {
        (**self).call(ctx, request).await
    }
}

/// Adapts an async closure into an [`Endpoint`].
pub struct FnEndpoint<F, Req> {
    f: F,
    _req: PhantomData<fn(Req)>,
}

impl<F, Req> FnEndpoint<F, Req> {
    pub fn new(f: F) -> Self {
        Self { f, _req: PhantomData }
    }
}

#[async_trait]
impl<F, Fut, Req, Resp> Endpoint<Req, Resp> for FnEndpoint<F, Req>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    F: Fn(CallContext, Req) -> Fut + Send + Sync,
    Fut: Future<Output = CallResult<Resp>> + Send + 'static,
{
    async fn call(&self, ctx: &CallContext, request: Req) -> CallResult<Resp> {
        (self.f)(ctx.clone(), request).await
    }
}

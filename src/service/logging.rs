//! Logging middleware: one structured event per service call.
//!
//! Payloads are never logged, only their sizes.

use std::time::Instant;

use async_trait::async_trait;

use crate::endpoint::{CallContext, CallResult};
use crate::service::{SharedStringService, StringService};

pub struct LoggingStringService {
    next: SharedStringService,
}

impl LoggingStringService {
    pub fn new(next: SharedStringService) -> Self {
        Self { next }
    }
}

#[async_trait]
impl StringService for LoggingStringService {
    fn reverse(&self, value: &str) -> String {
        let start = Instant::now();
        let result = self.next.reverse(value);
        tracing::info!(
            method = "reverse",
            input_len = value.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Service call"
        );
        result
    }

    async fn hello(&self, ctx: &CallContext) -> CallResult<String> {
        let start = Instant::now();
        let result = self.next.hello(ctx).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(greeting) => tracing::info!(
                method = "hello",
                output_len = greeting.len(),
                elapsed_ms,
                "Service call"
            ),
            Err(e) => tracing::warn!(
                method = "hello",
                error = %e,
                elapsed_ms,
                "Service call failed"
            ),
        }
        result
    }
}

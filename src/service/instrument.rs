//! Instrumenting middleware: request count and latency per method.

use std::time::Instant;

use async_trait::async_trait;

use crate::endpoint::{CallContext, CallResult};
use crate::observability::metrics;
use crate::service::{SharedStringService, StringService};

/// Records `string_service_requests_total` and latency for every call,
/// whatever its outcome.
pub struct InstrumentedStringService {
    next: SharedStringService,
}

impl InstrumentedStringService {
    pub fn new(next: SharedStringService) -> Self {
        Self { next }
    }
}

#[async_trait]
impl StringService for InstrumentedStringService {
    fn reverse(&self, value: &str) -> String {
        let start = Instant::now();
        let result = self.next.reverse(value);
        metrics::record_service_call("reverse", start);
        result
    }

    async fn hello(&self, ctx: &CallContext) -> CallResult<String> {
        let start = Instant::now();
        let result = self.next.hello(ctx).await;
        metrics::record_service_call("hello", start);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::LocalStringService;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_forwards_results_unchanged() {
        let service = InstrumentedStringService::new(Arc::new(LocalStringService::new("n")));
        assert_eq!(service.reverse("ab"), "ba");
        assert_eq!(service.hello(&CallContext::new()).await.unwrap(), "Hello world! n");
    }
}

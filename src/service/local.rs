//! Local implementation of the string service.

use async_trait::async_trait;

use crate::endpoint::{CallContext, CallResult};
use crate::service::StringService;

/// In-process implementation; also the fallback when no instances are configured.
#[derive(Debug, Clone, Default)]
pub struct LocalStringService {
    name: String,
}

impl LocalStringService {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl StringService for LocalStringService {
    fn reverse(&self, value: &str) -> String {
        value.chars().rev().collect()
    }

    async fn hello(&self, _ctx: &CallContext) -> CallResult<String> {
        Ok(format!("Hello world! {}", self.name))
    }
}

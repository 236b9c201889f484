//! Proxy middleware: routes `hello` through the resilient remote pipeline.
//!
//! # Responsibilities
//! - Decide once, at construction, between passthrough and remote mode
//! - Build instance pool → round-robin balancer → retry orchestrator
//! - Forward `reverse` to the wrapped implementation untouched
//!
//! # Design Decisions
//! - No configured instances means the wrapped service is returned as is;
//!   no breaker, limiter or balancer state is created
//! - The outbound client is injected so callers control timeouts and tests
//!   can swap the network endpoint for a fake

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method};
use thiserror::Error;
use url::Url;

use crate::config::ResilienceConfig;
use crate::endpoint::{BoxEndpoint, CallContext, CallResult, Endpoint, HttpEndpoint};
use crate::load_balancer::pool::{InstancePool, PoolError};
use crate::resilience::retries::{Retry, RetryPolicy};
use crate::service::{HelloResponse, SharedStringService, StringService};

/// Path of the greeting operation on every instance.
pub const GREETINGS_PATH: &str = "/strings/greetings";

/// Error type for proxy construction.
#[derive(Debug, Error)]
pub enum ProxyBuildError {
    #[error("invalid instance URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported scheme in instance URL '{0}' (expected http or https)")]
    UnsupportedScheme(String),

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Split a comma-separated instance list into URLs.
///
/// Entries are trimmed and blank entries dropped, so an empty or
/// whitespace-only list yields no instances.
pub fn parse_instances(raw: &str) -> Result<Vec<Url>, ProxyBuildError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let url = Url::parse(entry).map_err(|source| ProxyBuildError::InvalidUrl {
                url: entry.to_string(),
                source,
            })?;
            match url.scheme() {
                "http" | "https" => Ok(url),
                _ => Err(ProxyBuildError::UnsupportedScheme(entry.to_string())),
            }
        })
        .collect()
}

/// Wraps a string service, serving `hello` from remote instances.
pub struct ProxyStringService {
    next: SharedStringService,
    hello: BoxEndpoint<(), HelloResponse>,
}

impl ProxyStringService {
    pub fn new(next: SharedStringService, hello: BoxEndpoint<(), HelloResponse>) -> Self {
        Self { next, hello }
    }
}

#[async_trait]
impl StringService for ProxyStringService {
    fn reverse(&self, value: &str) -> String {
        self.next.reverse(value)
    }

    async fn hello(&self, ctx: &CallContext) -> CallResult<String> {
        let response = self.hello.call(ctx, ()).await?;
        Ok(response.result)
    }
}

/// Decorate `next` with the remote pipeline when `instances` lists any URL.
pub fn make_proxy(
    instances: Option<&str>,
    config: &ResilienceConfig,
    client: Client,
    next: SharedStringService,
) -> Result<SharedStringService, ProxyBuildError> {
    make_proxy_with(instances, config, next, |url| {
        let endpoint = HttpEndpoint::<HelloResponse>::new(client.clone(), Method::GET, url, GREETINGS_PATH)
            .map_err(|e| PoolError::Endpoint {
                instance: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Arc::new(endpoint) as BoxEndpoint<(), HelloResponse>)
    })
}

/// Like [`make_proxy`], with a caller-supplied network endpoint per instance.
pub fn make_proxy_with<F>(
    instances: Option<&str>,
    config: &ResilienceConfig,
    next: SharedStringService,
    make_endpoint: F,
) -> Result<SharedStringService, ProxyBuildError>
where
    F: FnMut(&Url) -> Result<BoxEndpoint<(), HelloResponse>, PoolError>,
{
    let urls = match instances {
        Some(raw) => parse_instances(raw)?,
        None => Vec::new(),
    };

    if urls.is_empty() {
        tracing::info!("No remote instances configured, serving greetings locally");
        return Ok(next);
    }

    let pool = Arc::new(InstancePool::build(urls, config, make_endpoint)?);
    tracing::info!(
        instances = pool.len(),
        max_attempts = config.retries.max_attempts,
        max_elapsed_ms = config.retries.max_elapsed_ms,
        "Remote greeting pipeline ready"
    );

    let retry = Retry::new(pool, RetryPolicy::from(&config.retries));
    Ok(Arc::new(ProxyStringService::new(next, Arc::new(retry))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{CallError, FnEndpoint};
    use crate::service::LocalStringService;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn local() -> SharedStringService {
        Arc::new(LocalStringService::new("local"))
    }

    fn counting_factory(
        calls: Arc<AtomicU32>,
        fail: bool,
    ) -> impl FnMut(&Url) -> Result<BoxEndpoint<(), HelloResponse>, PoolError> {
        move |url| {
            let calls = calls.clone();
            let host = url.host_str().unwrap_or_default().to_string();
            Ok(Arc::new(FnEndpoint::new(move |_ctx: CallContext, _req: ()| {
                let calls = calls.clone();
                let host = host.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if fail {
                        Err(CallError::downstream(host, "unexpected status 503"))
                    } else {
                        Ok(HelloResponse {
                            result: format!("Hello from {}", host),
                        })
                    }
                }
            })) as BoxEndpoint<(), HelloResponse>)
        }
    }

    #[test]
    fn test_parse_instances() {
        let urls = parse_instances(" http://a:1 , ,https://b:2/base ").unwrap();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].as_str(), "http://a:1/");
        assert_eq!(urls[1].as_str(), "https://b:2/base");

        assert!(parse_instances("").unwrap().is_empty());
        assert!(parse_instances(" , ").unwrap().is_empty());
        assert!(matches!(
            parse_instances("localhost:8080"),
            Err(ProxyBuildError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            parse_instances("http://a:1,not a url"),
            Err(ProxyBuildError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_passthrough_without_instances() {
        let built = Arc::new(AtomicU32::new(0));
        let calls = Arc::new(AtomicU32::new(0));
        for instances in [None, Some(""), Some(" , ")] {
            let mut factory = counting_factory(calls.clone(), false);
            let builds = built.clone();
            let service = make_proxy_with(instances, &ResilienceConfig::default(), local(), move |url| {
                builds.fetch_add(1, Ordering::SeqCst);
                factory(url)
            })
            .unwrap();

            assert_eq!(service.hello(&CallContext::new()).await.unwrap(), "Hello world! local");
            assert_eq!(service.reverse("abc"), "cba");
        }
        assert_eq!(built.load(Ordering::SeqCst), 0, "no endpoint may be built in passthrough");
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let mut factory = counting_factory(calls.clone(), false);
        let builds = built.clone();
        make_proxy_with(Some("http://a:1"), &ResilienceConfig::default(), local(), move |url| {
            builds.fetch_add(1, Ordering::SeqCst);
            factory(url)
        })
        .unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hello_is_served_remotely_round_robin() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut config = ResilienceConfig::default();
        config.rate_limit.interval_ms = 1;
        config.rate_limit.burst_size = 10;
        let service = make_proxy_with(
            Some("http://a:1,http://b:2"),
            &config,
            local(),
            counting_factory(calls.clone(), false),
        )
        .unwrap();
        let ctx = CallContext::new();

        assert_eq!(service.hello(&ctx).await.unwrap(), "Hello from a");
        assert_eq!(service.hello(&ctx).await.unwrap(), "Hello from b");
        assert_eq!(service.hello(&ctx).await.unwrap(), "Hello from a");
        assert_eq!(service.reverse("abc"), "cba");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failures_surface_as_retries_exhausted() {
        let calls = Arc::new(AtomicU32::new(0));
        let service = make_proxy_with(
            Some("http://a:1,http://b:2"),
            &ResilienceConfig::default(),
            local(),
            counting_factory(calls.clone(), true),
        )
        .unwrap();

        let err = service.hello(&CallContext::new()).await.unwrap_err();
        assert!(matches!(err, CallError::RetriesExhausted { attempts: 2, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_invalid_instances_fail_construction() {
        let result = make_proxy(
            Some("ftp://files:21"),
            &ResilienceConfig::default(),
            Client::new(),
            local(),
        );
        assert!(matches!(result, Err(ProxyBuildError::UnsupportedScheme(_))));
    }
}

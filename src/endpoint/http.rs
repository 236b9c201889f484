//! HTTP endpoint: one request to one instance.
//!
//! # Responsibilities
//! - Issue the request with the injected client
//! - Decode a JSON response body
//! - Map transport, status and decode failures to `CallError::Downstream`
//! - Abort the in-flight request when the call context ends

use std::marker::PhantomData;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use url::Url;

use crate::endpoint::{CallContext, CallError, CallResult, Endpoint};

/// Network endpoint for a body-less request that answers with JSON.
pub struct HttpEndpoint<Resp> {
    client: Client,
    method: Method,
    url: Url,
    instance: String,
    _resp: PhantomData<fn() -> Resp>,
}

impl<Resp> HttpEndpoint<Resp> {
    /// Create an endpoint targeting `path` below the instance base URL.
    pub fn new(client: Client, method: Method, base: &Url, path: &str) -> Result<Self, url::ParseError> {
        let url = join_path(base, path)?;
        Ok(Self {
            client,
            method,
            url,
            instance: base.as_str().trim_end_matches('/').to_string(),
            _resp: PhantomData,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Join `path` onto `base`, keeping any path prefix the base already has.
pub fn join_path(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path.trim_start_matches('/'))
}

#[async_trait]
impl<Resp> Endpoint<(), Resp> for HttpEndpoint<Resp>
where
    Resp: DeserializeOwned + Send + 'static,
{
    async fn call(&self, ctx: &CallContext, _request: ()) -> CallResult<Resp> {
        let request = self.client.request(self.method.clone(), self.url.clone());

        ctx.run(async move {
            let response = request
                .send()
                .await
                .map_err(|e| CallError::downstream(&self.instance, e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(CallError::downstream(
                    &self.instance,
                    format!("unexpected status {}", status),
                ));
            }

            response
                .json::<Resp>()
                .await
                .map_err(|e| CallError::downstream(&self.instance, format!("decode failed: {}", e)))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path_keeps_prefix() {
        let base = Url::parse("http://10.0.0.1:8080").unwrap();
        assert_eq!(
            join_path(&base, "/strings/greetings").unwrap().as_str(),
            "http://10.0.0.1:8080/strings/greetings"
        );

        let base = Url::parse("http://gateway/replica-a").unwrap();
        assert_eq!(
            join_path(&base, "strings/greetings").unwrap().as_str(),
            "http://gateway/replica-a/strings/greetings"
        );
    }

    #[tokio::test]
    async fn test_connection_error_is_downstream() {
        let base = Url::parse("http://127.0.0.1:1").unwrap();
        let endpoint: HttpEndpoint<serde_json::Value> =
            HttpEndpoint::new(Client::new(), Method::GET, &base, "/strings/greetings").unwrap();

        let err = endpoint.call(&CallContext::new(), ()).await.unwrap_err();
        match err {
            CallError::Downstream { instance, .. } => assert_eq!(instance, "http://127.0.0.1:1"),
            other => panic!("unexpected error: {other}"),
        }
    }
}

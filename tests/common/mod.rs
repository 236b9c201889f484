//! Shared utilities for integration and load testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use resilient_proxy::config::ProxyConfig;
use resilient_proxy::http::HttpServer;
use resilient_proxy::lifecycle::Shutdown;
use resilient_proxy::service::{
    make_proxy, InstrumentedStringService, LocalStringService, LoggingStringService,
    SharedStringService,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start a programmable mock instance on an ephemeral port.
///
/// Every connection gets one response from `f`. Returns the bound address.
#[allow(dead_code)]
pub async fn start_programmable_instance<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        // Request line and headers fit in one read for these tests.
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Mock instance answering every greeting with `name`, counting calls.
#[allow(dead_code)]
pub async fn start_greeting_instance(name: &'static str, calls: Arc<AtomicU32>) -> SocketAddr {
    start_programmable_instance(move || {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            (200, format!(r#"{{"result":"Hello world! {}"}}"#, name))
        }
    })
    .await
}

/// Mock instance that always fails with `status`, counting calls.
#[allow(dead_code)]
pub async fn start_failing_instance(status: u16, calls: Arc<AtomicU32>) -> SocketAddr {
    start_programmable_instance(move || {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            (status, r#"{"error":"unavailable"}"#.to_string())
        }
    })
    .await
}

/// Comma-separated instance list for `service.instances`.
#[allow(dead_code)]
pub fn instance_list(addrs: &[SocketAddr]) -> String {
    addrs
        .iter()
        .map(|addr| format!("http://{}", addr))
        .collect::<Vec<_>>()
        .join(",")
}

/// Config with a name and instances, listening on an ephemeral port.
#[allow(dead_code)]
pub fn test_config(instances: Option<String>) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.service.name = "proxy-test".into();
    config.service.instances = instances;
    config
}

/// Build the full service stack and serve it. Returns the address and the
/// shutdown handle keeping the server alive.
#[allow(dead_code)]
pub async fn start_proxy(config: ProxyConfig) -> (SocketAddr, Shutdown) {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(config.timeouts.remote_call_ms))
        .no_proxy()
        .build()
        .unwrap();

    let local: SharedStringService = Arc::new(LocalStringService::new(config.service.name.clone()));
    let proxied = make_proxy(
        config.service.instances.as_deref(),
        &config.resilience,
        client,
        local,
    )
    .unwrap();
    let service: SharedStringService = Arc::new(InstrumentedStringService::new(Arc::new(
        LoggingStringService::new(proxied),
    )));

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config, service);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// Client without connection pooling or system proxy.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

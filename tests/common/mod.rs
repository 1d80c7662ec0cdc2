//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use sw_cache_proxy::cache::{CacheStore, MemoryCache};
use sw_cache_proxy::fetch::{CacheRequest, FetchError, Fetcher, StoredResponse};

/// Request line and headers as seen by the mock origin.
#[derive(Debug, Clone)]
pub struct OriginRequest {
    pub path: String,
    pub headers: HashMap<String, String>,
}

impl OriginRequest {
    /// Header value by lowercase name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Start a programmable mock origin. `f` receives the request and returns
/// the status and body to answer with.
pub async fn start_programmable_origin<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn(OriginRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let request = match read_request(&mut socket).await {
                            Some(request) => request,
                            None => return,
                        };
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            206 => "206 Partial Content",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
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
}

/// Read the request head: path from the request line plus headers.
async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<OriginRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let head = String::from_utf8_lossy(&buf);
    let mut lines = head.lines();
    let path = lines.next()?.split_whitespace().nth(1)?.to_string();
    let headers = lines
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    Some(OriginRequest { path, headers })
}

/// Per-path scripted network: each path settles after a delay.
#[derive(Default)]
pub struct ScriptedNetwork {
    routes: HashMap<String, (Duration, Result<StoredResponse, FetchError>)>,
    calls: AtomicUsize,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeed(mut self, path: &str, delay_ms: u64, body: &'static str) -> Self {
        self.routes.insert(
            path.to_string(),
            (Duration::from_millis(delay_ms), Ok(StoredResponse::ok(body))),
        );
        self
    }

    pub fn fail(mut self, path: &str, delay_ms: u64) -> Self {
        self.routes.insert(
            path.to_string(),
            (
                Duration::from_millis(delay_ms),
                Err(FetchError::Connect("offline".into())),
            ),
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedNetwork {
    async fn fetch(&self, request: &CacheRequest) -> Result<StoredResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.routes.get(request.url.path()) {
            Some((delay, outcome)) => {
                tokio::time::sleep(*delay).await;
                outcome.clone()
            }
            None => Err(FetchError::Status(Box::new(StoredResponse::new(
                StatusCode::NOT_FOUND,
                HeaderMap::new(),
                "not found",
            )))),
        }
    }
}

/// A `MemoryCache` whose lookups take `delay` to answer.
pub struct SlowCache {
    pub inner: MemoryCache,
    delay: Duration,
    lookups: Mutex<Vec<String>>,
}

impl SlowCache {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            inner: MemoryCache::new("test", None),
            delay: Duration::from_millis(delay_ms),
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl CacheStore for SlowCache {
    async fn lookup(&self, key: &str) -> Option<StoredResponse> {
        self.lookups.lock().unwrap().push(key.to_string());
        tokio::time::sleep(self.delay).await;
        self.inner.lookup(key).await
    }

    async fn put(&self, key: &str, response: StoredResponse) {
        self.inner.put(key, response).await
    }

    async fn delete(&self, key: &str) -> bool {
        self.inner.delete(key).await
    }

    async fn keys(&self) -> Vec<String> {
        self.inner.keys().await
    }

    async fn len(&self) -> usize {
        self.inner.len().await
    }
}

/// Client that never reuses connections and ignores proxy env vars.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

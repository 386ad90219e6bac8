//! Transport engines: one HTTP request through one concrete stack.
//!
//! Every engine implements [`TransportEngine`] and shares the request/response
//! shapes defined here. The status policy (fail above 399, except 404) lives in
//! [`check_status`] and nowhere else.

pub mod blocking;
#[cfg(feature = "browser")]
pub mod browser;
pub mod impersonate;
pub mod reqwest_async;

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method};
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

use crate::response::FetchResponse;

pub use blocking::BlockingEngine;
#[cfg(feature = "browser")]
pub use browser::BrowserEngine;
pub use impersonate::ImpersonateEngine;
pub use reqwest_async::AsyncEngine;

/// Tag identifying which stack an engine drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineKind {
    /// Plain async HTTP client.
    Async,
    /// Blocking client dispatched onto the worker pool.
    Blocking,
    /// Client presenting a browser TLS/ALPN and header profile.
    Impersonate,
    /// Headless Chrome driven over CDP.
    Browser,
    /// Engine supplied by the caller.
    External,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Async => "async",
            EngineKind::Blocking => "blocking",
            EngineKind::Impersonate => "impersonate",
            EngineKind::Browser => "browser",
            EngineKind::External => "external",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body variants accepted by the engines.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

impl RequestBody {
    pub fn content_type(&self) -> &'static str {
        match self {
            RequestBody::Json(_) => "application/json",
            RequestBody::Form(_) => "application/x-www-form-urlencoded",
        }
    }

    pub fn to_bytes(&self) -> Result<Bytes, TransportError> {
        match self {
            RequestBody::Json(value) => serde_json::to_vec(value)
                .map(Bytes::from)
                .map_err(|err| TransportError::Client(err.to_string())),
            RequestBody::Form(fields) => {
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(fields.iter())
                    .finish();
                Ok(Bytes::from(encoded))
            }
        }
    }
}

/// One fully-resolved attempt: headers already merged, proxy already chosen.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
    pub proxy: Option<String>,
    pub timeout: Duration,
}

impl FetchRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            proxy: None,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Option<RequestBody>) -> Self {
        self.body = body;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Encoded body plus the headers to send with it. A caller-provided
    /// `Content-Type` wins over the body's default.
    pub fn encoded(&self) -> Result<(HeaderMap, Option<Bytes>), TransportError> {
        let mut headers = self.headers.clone();
        let body = match &self.body {
            Some(body) => {
                if !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static(body.content_type()));
                }
                Some(body.to_bytes()?)
            }
            None => None,
        };
        Ok((headers, body))
    }
}

/// Failure of a single engine attempt. Recovered by the orchestrator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request to {url} failed with status {status}")]
    Status { status: u16, url: String },
    #[error("request to {url} was refused with status {status}")]
    Auth { status: u16, url: String },
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("tls handshake failed: {0}")]
    Tls(String),
    #[error("invalid proxy '{0}'")]
    Proxy(String),
    #[error("bot challenge served by {url}")]
    Challenge { url: String },
    #[error("browser error: {0}")]
    Browser(String),
    #[error("engine does not support {0}")]
    Unsupported(String),
    #[error("worker pool error: {0}")]
    Worker(String),
    #[error("http client error: {0}")]
    Client(String),
    #[error("invalid request header: {0}")]
    Header(String),
}

impl TransportError {
    pub fn is_auth(&self) -> bool {
        matches!(self, TransportError::Auth { .. })
    }
}

/// Classify a reqwest failure (async or blocking client).
pub(crate) fn classify(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout(timeout);
    }
    if is_tls_failure(&err) {
        return TransportError::Tls(err.to_string());
    }
    if err.is_connect() {
        return TransportError::Connect(err.to_string());
    }
    TransportError::Client(err.to_string())
}

fn is_tls_failure(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        let message = source.to_string().to_ascii_lowercase();
        if message.contains("handshake") || message.contains("certificate") {
            return true;
        }
        current = source.source();
    }
    false
}

/// Status policy shared by all engines: anything above 399 fails, except
/// 404 which is a meaningful "not found" result. 401/403 map to the auth case.
pub fn check_status(status: u16, url: &Url) -> Result<(), TransportError> {
    match status {
        0..=399 | 404 => Ok(()),
        401 | 403 => Err(TransportError::Auth {
            status,
            url: url.to_string(),
        }),
        _ => Err(TransportError::Status {
            status,
            url: url.to_string(),
        }),
    }
}

/// Contract implemented by every transport stack.
#[async_trait]
pub trait TransportEngine: Send + Sync {
    fn kind(&self) -> EngineKind;

    fn name(&self) -> &str {
        self.kind().as_str()
    }

    /// Headers this engine wants layered over the session headers.
    fn header_overrides(&self, _url: &Url) -> HeaderMap {
        HeaderMap::new()
    }

    async fn execute(&self, request: &FetchRequest) -> Result<FetchResponse, TransportError>;
}

/// Ordered engine chain.
pub type EngineChain = Vec<Arc<dyn TransportEngine>>;

/// Default chain: TLS-profiled client first, then the plain async client,
/// then the blocking client on the worker pool.
pub fn default_chain(pool: WorkerPool) -> EngineChain {
    vec![
        Arc::new(ImpersonateEngine::new()),
        Arc::new(AsyncEngine::new()),
        Arc::new(BlockingEngine::new(pool)),
    ]
}

/// Bounded pool for engines that must not run on the async executor.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run a blocking closure on tokio's blocking threads, at most `size` at once.
    pub async fn run<F, T>(&self, job: F) -> Result<T, TransportError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit: OwnedSemaphorePermit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|err| TransportError::Worker(err.to_string()))?;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|err| TransportError::Worker(err.to_string()))
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(4)
    }
}

/// Fold a reqwest async response into a [`FetchResponse`], applying the status policy.
pub(crate) async fn read_response(
    response: reqwest::Response,
    timeout: Duration,
) -> Result<FetchResponse, TransportError> {
    let status = response.status().as_u16();
    let url = response.url().clone();
    let headers = response.headers().clone();
    check_status(status, &url)?;
    let body = response
        .text()
        .await
        .map_err(|err| classify(err, timeout))?;
    Ok(FetchResponse::from_parts(status, &headers, body))
}

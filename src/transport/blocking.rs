//! Blocking reqwest engine, dispatched onto the bounded [`WorkerPool`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;

use super::{
    EngineKind, FetchRequest, TransportEngine, TransportError, WorkerPool, check_status, classify,
};
use crate::response::FetchResponse;

/// Synchronous client run off the async executor.
pub struct BlockingEngine {
    pool: WorkerPool,
}

impl BlockingEngine {
    pub fn new(pool: WorkerPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }
}

#[async_trait]
impl TransportEngine for BlockingEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Blocking
    }

    async fn execute(&self, request: &FetchRequest) -> Result<FetchResponse, TransportError> {
        let request = request.clone();
        self.pool.run(move || execute_blocking(&request)).await?
    }
}

fn build_client(proxy: Option<&str>, timeout: Duration) -> Result<Client, TransportError> {
    let mut builder = Client::builder()
        .danger_accept_invalid_certs(true)
        .redirect(Policy::default())
        .timeout(timeout);

    if let Some(endpoint) = proxy {
        let proxy = reqwest::Proxy::all(endpoint)
            .map_err(|_| TransportError::Proxy(endpoint.to_string()))?;
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(|err| classify(err, timeout))
}

fn execute_blocking(request: &FetchRequest) -> Result<FetchResponse, TransportError> {
    let client = build_client(request.proxy.as_deref(), request.timeout)?;
    let (headers, body) = request.encoded()?;

    let mut builder = client
        .request(request.method.clone(), request.url.clone())
        .headers(headers);
    if let Some(body) = body {
        builder = builder.body(body.to_vec());
    }

    let response = builder.send().map_err(|err| classify(err, request.timeout))?;
    let status = response.status().as_u16();
    let headers = response.headers().clone();
    check_status(status, response.url())?;
    let body = response
        .text()
        .map_err(|err| classify(err, request.timeout))?;
    Ok(FetchResponse::from_parts(status, &headers, body))
}

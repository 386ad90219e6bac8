//! Plain async HTTP engine backed by `reqwest::Client`.
//!
//! By default every attempt gets a fresh client so cookies never leak between
//! attempts; [`AsyncEngine::shared`] keeps one client per proxy endpoint for
//! callers that want connection and session reuse.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, redirect::Policy};
use tokio::sync::Mutex;

use super::{EngineKind, FetchRequest, TransportEngine, TransportError, classify, read_response};
use crate::response::FetchResponse;

const MAX_REDIRECTS: usize = 10;

/// Async reqwest engine.
pub struct AsyncEngine {
    clients: Option<Mutex<HashMap<Option<String>, Client>>>,
}

impl AsyncEngine {
    pub fn new() -> Self {
        Self { clients: None }
    }

    /// Reuse one client per proxy endpoint across attempts and calls.
    pub fn shared() -> Self {
        Self {
            clients: Some(Mutex::new(HashMap::new())),
        }
    }

    async fn client(&self, proxy: Option<&str>, timeout: Duration) -> Result<Client, TransportError> {
        let Some(pool) = &self.clients else {
            return build_client(proxy, timeout);
        };

        let mut guard = pool.lock().await;
        let key = proxy.map(str::to_string);
        if let Some(client) = guard.get(&key) {
            return Ok(client.clone());
        }
        let client = build_client(proxy, timeout)?;
        guard.insert(key, client.clone());
        Ok(client)
    }
}

impl Default for AsyncEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn build_client(proxy: Option<&str>, timeout: Duration) -> Result<Client, TransportError> {
    let mut builder = Client::builder()
        .danger_accept_invalid_certs(true)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .timeout(timeout);

    if let Some(endpoint) = proxy {
        let proxy = reqwest::Proxy::all(endpoint)
            .map_err(|_| TransportError::Proxy(endpoint.to_string()))?;
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(|err| classify(err, timeout))
}

#[async_trait]
impl TransportEngine for AsyncEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Async
    }

    async fn execute(&self, request: &FetchRequest) -> Result<FetchResponse, TransportError> {
        let client = self.client(request.proxy.as_deref(), request.timeout).await?;
        let (headers, body) = request.encoded()?;

        let mut builder = client
            .request(request.method.clone(), request.url.clone())
            .headers(headers)
            .timeout(request.timeout);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| classify(err, request.timeout))?;
        read_response(response, request.timeout).await
    }
}

//! Headless Chrome engine over the DevTools protocol.
//!
//! Either launches a local Chrome or attaches to a remote DevTools endpoint.
//! The browser session is always released before `execute` returns, whatever
//! the outcome of the navigation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use http::Method;
use http::header::USER_AGENT;
use rand::seq::SliceRandom;
use tokio::task::JoinHandle;

use super::{EngineKind, FetchRequest, TransportEngine, TransportError};
use crate::response::FetchResponse;

const HIDE_WEBDRIVER: &str =
    "Object.defineProperty(navigator, 'webdriver', {get: () => undefined, configurable: true});";

const LAUNCH_ARGS: &[&str] = &[
    "--lang=en",
    "--disable-gpu",
    "--no-sandbox",
    "--disable-extensions",
    "--disable-session-crashed-bubble",
    "--disable-dev-shm-usage",
    "--disable-blink-features=AutomationControlled",
    "--disable-notifications",
    "--disable-popup-blocking",
    "--ignore-certificate-errors",
    "--no-first-run",
];

/// Chrome-backed engine. GET only; other methods fail so the chain moves on.
pub struct BrowserEngine {
    remote: Option<String>,
    proxies: Vec<String>,
    executable: Option<PathBuf>,
}

impl BrowserEngine {
    /// Launch a local Chrome per attempt.
    pub fn local() -> Self {
        Self {
            remote: None,
            proxies: Vec::new(),
            executable: None,
        }
    }

    /// Attach to a remote DevTools endpoint (`http://host:9222` or `ws://…`).
    /// Blank endpoints fall back to a local launch.
    pub fn remote(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        let endpoint = endpoint.trim();
        Self {
            remote: (!endpoint.is_empty()).then(|| endpoint.to_string()),
            proxies: Vec::new(),
            executable: None,
        }
    }

    /// Proxies reserved for the browser; one is chosen at random per attempt
    /// and takes precedence over the orchestrator's pick.
    pub fn with_proxies(mut self, proxies: Vec<String>) -> Self {
        self.proxies = proxies;
        self
    }

    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.remote.as_deref()
    }

    fn proxy_for(&self, request: &FetchRequest) -> Option<String> {
        self.proxies
            .choose(&mut rand::thread_rng())
            .cloned()
            .or_else(|| request.proxy.clone())
    }

    fn setup_for(&self, request: &FetchRequest) -> PageSetup {
        PageSetup {
            proxy: self.proxy_for(request),
            user_agent: request
                .headers
                .get(USER_AGENT)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
        }
    }

    async fn open(
        &self,
        request: &FetchRequest,
        setup: &PageSetup,
    ) -> Result<BrowserSession, TransportError> {
        match &self.remote {
            Some(endpoint) => BrowserSession::connect(endpoint).await,
            None => {
                let mut builder = BrowserConfig::builder().request_timeout(request.timeout);
                if let Some(ref path) = self.executable {
                    builder = builder.chrome_executable(path);
                }
                for arg in LAUNCH_ARGS {
                    builder = builder.arg(*arg);
                }
                if let Some(ref agent) = setup.user_agent {
                    builder = builder.arg(format!("--user-agent={agent}"));
                }
                if let Some(ref proxy) = setup.proxy {
                    log::debug!("browser using proxy {proxy}");
                    builder = builder.arg(format!("--proxy-server={proxy}"));
                }
                let config = builder.build().map_err(TransportError::Browser)?;
                BrowserSession::launch(config).await
            }
        }
    }
}

/// Proxy and user agent one page is opened with.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PageSetup {
    proxy: Option<String>,
    user_agent: Option<String>,
}

/// A live browser plus the task pumping its CDP handler.
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    owned: bool,
}

impl BrowserSession {
    async fn launch(config: BrowserConfig) -> Result<Self, TransportError> {
        let (browser, handler) = Browser::launch(config).await.map_err(browser_error)?;
        Ok(Self {
            browser,
            handler: pump(handler),
            owned: true,
        })
    }

    async fn connect(endpoint: &str) -> Result<Self, TransportError> {
        let ws_url = resolve_ws_url(endpoint).await?;
        let (browser, handler) = Browser::connect(ws_url).await.map_err(browser_error)?;
        Ok(Self {
            browser,
            handler: pump(handler),
            owned: false,
        })
    }

    /// Open one page, load the request and close the page again. On a remote
    /// browser the page lives in a throwaway context carrying the proxy.
    async fn fetch(
        &self,
        request: &FetchRequest,
        setup: &PageSetup,
    ) -> Result<FetchResponse, TransportError> {
        let context = if self.owned {
            None
        } else {
            Some(self.create_context(setup.proxy.clone()).await?)
        };

        let mut target = CreateTargetParams::new("about:blank");
        target.browser_context_id = context.clone();
        let outcome = match self.browser.new_page(target).await {
            Ok(page) => {
                let outcome = load(&page, request, setup).await;
                if let Err(err) = page.close().await {
                    log::debug!("closing browser page failed: {err}");
                }
                outcome
            }
            Err(err) => Err(browser_error(err)),
        };

        if let Some(id) = context {
            if let Err(err) = self.browser.execute(DisposeBrowserContextParams::new(id)).await {
                log::debug!("disposing browser context failed: {err}");
            }
        }
        outcome
    }

    async fn create_context(
        &self,
        proxy: Option<String>,
    ) -> Result<BrowserContextId, TransportError> {
        if let Some(ref proxy) = proxy {
            log::debug!("remote browser context using proxy {proxy}");
        }
        let mut params = CreateBrowserContextParams::default();
        params.proxy_server = proxy;
        params.dispose_on_detach = Some(true);
        let created = self.browser.execute(params).await.map_err(browser_error)?;
        Ok(created.result.browser_context_id)
    }

    /// Shut the session down. A launched browser is closed; a remote one is
    /// only detached from.
    async fn release(mut self) {
        if self.owned {
            if let Err(err) = self.browser.close().await {
                log::debug!("closing browser failed: {err}");
            }
            if let Err(err) = self.browser.wait().await {
                log::debug!("waiting for browser exit failed: {err}");
            }
        }
        self.handler.abort();
    }
}

fn pump(mut handler: chromiumoxide::Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    })
}

fn browser_error(err: impl std::fmt::Display) -> TransportError {
    TransportError::Browser(err.to_string())
}

/// DevTools HTTP endpoints expose the websocket address under `/json/version`.
async fn resolve_ws_url(endpoint: &str) -> Result<String, TransportError> {
    if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
        return Ok(endpoint.to_string());
    }
    let version_url = format!("{}/json/version", endpoint.trim_end_matches('/'));
    let info: serde_json::Value = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()
        .map_err(browser_error)?
        .get(&version_url)
        .send()
        .await
        .map_err(browser_error)?
        .json()
        .await
        .map_err(browser_error)?;
    info.get("webSocketDebuggerUrl")
        .and_then(|value| value.as_str())
        .map(str::to_string)
        .ok_or_else(|| TransportError::Browser(format!("no webSocketDebuggerUrl at {version_url}")))
}

async fn load(
    page: &Page,
    request: &FetchRequest,
    setup: &PageSetup,
) -> Result<FetchResponse, TransportError> {
    if let Some(ref agent) = setup.user_agent {
        page.execute(SetUserAgentOverrideParams::new(agent.clone()))
            .await
            .map_err(browser_error)?;
    }
    navigate(page, request).await
}

async fn navigate(page: &Page, request: &FetchRequest) -> Result<FetchResponse, TransportError> {
    page.execute(AddScriptToEvaluateOnNewDocumentParams::new(HIDE_WEBDRIVER))
        .await
        .map_err(browser_error)?;

    let load = async {
        page.goto(request.url.as_str()).await?;
        page.wait_for_navigation().await?;
        let content = page.content().await?;
        let cookies = page.get_cookies().await?;
        Ok::<_, chromiumoxide::error::CdpError>((content, cookies))
    };

    let (content, cookies) = tokio::time::timeout(request.timeout, load)
        .await
        .map_err(|_| TransportError::Timeout(request.timeout))?
        .map_err(browser_error)?;

    let cookies: BTreeMap<String, String> = cookies
        .into_iter()
        .map(|cookie| (cookie.name, cookie.value))
        .collect();

    // DevTools does not surface the document status; a rendered page counts as 200.
    let mut response = FetchResponse::new(200, content);
    response.cookies = cookies;
    Ok(response)
}

#[async_trait]
impl TransportEngine for BrowserEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Browser
    }

    async fn execute(&self, request: &FetchRequest) -> Result<FetchResponse, TransportError> {
        if request.method != Method::GET {
            return Err(TransportError::Unsupported(format!(
                "{} in headless browser",
                request.method
            )));
        }

        let setup = self.setup_for(request);
        let session = self.open(request, &setup).await?;
        let outcome = session.fetch(request, &setup).await;
        session.release().await;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use url::Url;

    #[tokio::test]
    async fn rejects_non_get_without_launching() {
        let engine = BrowserEngine::local();
        let request = FetchRequest::new(Method::POST, Url::parse("https://shop.example").unwrap());
        let err = engine.execute(&request).await.unwrap_err();
        assert!(matches!(err, TransportError::Unsupported(_)));
    }

    #[test]
    fn blank_remote_falls_back_to_local() {
        assert_eq!(BrowserEngine::remote("  ").endpoint(), None);
        assert_eq!(
            BrowserEngine::remote("http://chrome:9222").endpoint(),
            Some("http://chrome:9222")
        );
    }

    #[test]
    fn browser_proxies_take_precedence() {
        let engine = BrowserEngine::local().with_proxies(vec!["http://10.0.0.1:3128".into()]);
        let request = FetchRequest::new(Method::GET, Url::parse("https://shop.example").unwrap())
            .with_proxy(Some("http://10.0.0.2:8080".into()));
        assert_eq!(engine.proxy_for(&request).as_deref(), Some("http://10.0.0.1:3128"));
    }

    #[test]
    fn remote_setup_carries_proxy_and_agent() {
        let engine = BrowserEngine::remote("http://chrome:9222")
            .with_proxies(vec!["http://10.0.0.1:3128".into()]);
        let mut headers = http::HeaderMap::new();
        headers.insert(USER_AGENT, http::HeaderValue::from_static("MyApp/1.0 (Android 14) Mobile"));
        let request = FetchRequest::new(Method::GET, Url::parse("https://shop.example").unwrap())
            .with_headers(headers);
        assert_eq!(
            engine.setup_for(&request),
            PageSetup {
                proxy: Some("http://10.0.0.1:3128".into()),
                user_agent: Some("MyApp/1.0 (Android 14) Mobile".into()),
            }
        );
    }

    #[test]
    fn setup_falls_back_to_request_proxy() {
        let engine = BrowserEngine::remote("http://chrome:9222");
        let request = FetchRequest::new(Method::GET, Url::parse("https://shop.example").unwrap())
            .with_proxy(Some("http://10.0.0.2:8080".into()));
        let setup = engine.setup_for(&request);
        assert_eq!(setup.proxy.as_deref(), Some("http://10.0.0.2:8080"));
        assert_eq!(setup.user_agent, None);
    }

    #[tokio::test]
    #[ignore = "Requires a local Chrome installation"]
    async fn renders_page_with_local_chrome() {
        let engine = BrowserEngine::local();
        let request = FetchRequest::new(Method::GET, Url::parse("https://example.com").unwrap())
            .with_timeout(Duration::from_secs(30));
        let response = engine.execute(&request).await.unwrap();
        assert!(response.has());
    }
}

//! Engine that presents a consistent browser identity.
//!
//! Picks a [`BrowserProfile`] per domain, negotiates ALPN the way that browser
//! would, layers its client-hint headers over the session headers, and treats
//! bot-challenge interstitials as failures so the chain moves on. A challenge
//! also rotates the domain to a different profile for the next attempt.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use http::header::SERVER;
use http::{HeaderMap, HeaderName, HeaderValue};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use reqwest::{Client, redirect::Policy, tls};
use url::Url;

use super::{EngineKind, FetchRequest, TransportEngine, TransportError, check_status, classify};
use crate::modules::tls::{BrowserProfile, TlsConfig, TlsProfileManager};
use crate::response::FetchResponse;

pub struct ImpersonateEngine {
    profiles: Mutex<TlsProfileManager>,
}

impl ImpersonateEngine {
    pub fn new() -> Self {
        Self::with_config(TlsConfig::default())
    }

    pub fn with_config(config: TlsConfig) -> Self {
        Self {
            profiles: Mutex::new(TlsProfileManager::new(config)),
        }
    }

    fn with_profiles<T>(&self, f: impl FnOnce(&mut TlsProfileManager) -> T) -> T {
        let mut guard = self
            .profiles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    fn profile_for(&self, url: &Url) -> BrowserProfile {
        let domain = url.host_str().unwrap_or_default();
        self.with_profiles(|profiles| profiles.profile_for(domain))
    }
}

impl Default for ImpersonateEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn build_client(
    profile: &BrowserProfile,
    proxy: Option<&str>,
    timeout: Duration,
) -> Result<Client, TransportError> {
    let mut builder = Client::builder()
        .danger_accept_invalid_certs(true)
        .min_tls_version(tls::Version::TLS_1_2)
        .redirect(Policy::limited(10))
        .cookie_store(true)
        .timeout(timeout);

    if !profile.supports_http2() {
        builder = builder.http1_only();
    }

    if let Some(endpoint) = proxy {
        let proxy = reqwest::Proxy::all(endpoint)
            .map_err(|_| TransportError::Proxy(endpoint.to_string()))?;
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(|err| classify(err, timeout))
}

/// True when the response looks like a bot-defence interstitial rather than content.
pub fn is_challenge(status: u16, headers: &HeaderMap, body: &str) -> bool {
    if !matches!(status, 403 | 429 | 503) {
        return false;
    }
    let served_by_cdn = headers
        .get(SERVER)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            let value = value.to_ascii_lowercase();
            value.starts_with("cloudflare") || value.contains("akamai")
        })
        .unwrap_or(false);
    served_by_cdn || CHALLENGE_RE.is_match(body)
}

static CHALLENGE_RE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(
        r#"(cf-chl-|challenge-platform|cf_chl_opt|jschl-answer|g-recaptcha|h-captcha|_Incapsula_Resource|px-captcha)"#,
    )
    .case_insensitive(true)
    .build()
    .unwrap()
});

#[async_trait]
impl TransportEngine for ImpersonateEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Impersonate
    }

    fn header_overrides(&self, url: &Url) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in self.profile_for(url).headers() {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(HeaderName::from_static(name), value);
            }
        }
        headers
    }

    async fn execute(&self, request: &FetchRequest) -> Result<FetchResponse, TransportError> {
        let domain = request.url.host_str().unwrap_or_default().to_string();
        let profile = self.profile_for(&request.url);
        log::debug!(
            "impersonating {:?} (ja3 {}) for {}",
            profile.browser,
            profile.ja3,
            domain
        );

        let client = build_client(&profile, request.proxy.as_deref(), request.timeout)?;
        let (headers, body) = request.encoded()?;

        let mut builder = client
            .request(request.method.clone(), request.url.clone())
            .headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| classify(err, request.timeout))?;
        self.with_profiles(|profiles| profiles.record_request(&domain));

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let text = response
            .text()
            .await
            .map_err(|err| classify(err, request.timeout))?;

        if is_challenge(status, &headers, &text) {
            self.with_profiles(|profiles| profiles.rotate_profile(&domain));
            return Err(TransportError::Challenge {
                url: final_url.to_string(),
            });
        }
        check_status(status, &final_url)?;

        Ok(FetchResponse::from_parts(status, &headers, text))
    }
}

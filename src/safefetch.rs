//! Fetch orchestration.
//!
//! [`SafeFetch`] owns a session (identity headers, cookie jar, proxy
//! candidates) and walks an ordered chain of transport engines until one of
//! them produces a response. Engine failures are recorded rather than
//! propagated; the caller only sees an error when every attempt failed and
//! `raise_errors` was requested.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::header::{COOKIE, HOST, USER_AGENT};
use http::{HeaderMap, HeaderValue, Method};
use rand::Rng;
use thiserror::Error;
use tokio::time::sleep;
use url::{Position, Url};

use crate::config::FetchSettings;
use crate::modules::events::{
	AttemptEvent, EventDispatcher, EventHandler, ExhaustedEvent, FailureEvent, FetchEvent,
	SuccessEvent,
};
use crate::modules::identity::{CLIENT_HINT_HEADERS, DeviceClass, IdentityBuilder, IdentityError};
use crate::modules::proxy::ProxyPool;
use crate::response::{FetchResponse, cookie_header_value, parse_cookie_str};
use crate::transport::{
	EngineChain, EngineKind, FetchRequest, RequestBody, TransportEngine, TransportError,
	WorkerPool, default_chain,
};

/// Result alias used across the orchestration layer.
pub type FetchResult<T> = Result<T, FetchError>;

/// Extra time granted on top of the request timeout before an attempt is
/// abandoned from the outside.
const ATTEMPT_GRACE: Duration = Duration::from_secs(5);

/// Attempt budget used when neither the session nor the call sets one.
pub const DEFAULT_MAX_TRIES: usize = 10;

/// Error surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum FetchError {
	#[error("url parse error: {0}")]
	Url(#[from] url::ParseError),
	#[error("header conversion failed: {0}")]
	InvalidHeader(#[from] IdentityError),
	#[error("all {attempts} attempts failed, first error: {first}")]
	Exhausted {
		first: TransportError,
		attempts: usize,
		errors: Vec<TransportError>,
	},
}

impl FetchError {
	/// True when the surfaced failure was an authentication rejection.
	pub fn is_auth(&self) -> bool {
		matches!(self, FetchError::Exhausted { first, .. } if first.is_auth())
	}

	pub fn first_error(&self) -> Option<&TransportError> {
		match self {
			FetchError::Exhausted { first, .. } => Some(first),
			_ => None,
		}
	}
}

/// Callback run before every retry, with access to the outgoing identity.
pub type PostTryHook = Arc<dyn Fn(&mut IdentityBuilder) + Send + Sync>;

/// Per-call knobs for [`SafeFetch::request`].
#[derive(Clone)]
pub struct RequestOptions {
	pub body: Option<RequestBody>,
	pub timeout: Option<Duration>,
	/// Overrides the session budget for this call.
	pub max_tries: Option<usize>,
	pub raise_errors: bool,
	pub retain_cookie: bool,
	pub chain: Option<EngineChain>,
}

impl Default for RequestOptions {
	fn default() -> Self {
		Self {
			body: None,
			timeout: None,
			max_tries: None,
			raise_errors: false,
			retain_cookie: false,
			chain: None,
		}
	}
}

impl RequestOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn json(mut self, value: serde_json::Value) -> Self {
		self.body = Some(RequestBody::Json(value));
		self
	}

	pub fn form<I, K, V>(mut self, fields: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.body = Some(RequestBody::Form(
			fields
				.into_iter()
				.map(|(key, value)| (key.into(), value.into()))
				.collect(),
		));
		self
	}

	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);
		self
	}

	pub fn max_tries(mut self, max_tries: usize) -> Self {
		self.max_tries = Some(max_tries);
		self
	}

	pub fn raise_errors(mut self, raise: bool) -> Self {
		self.raise_errors = raise;
		self
	}

	pub fn retain_cookie(mut self, retain: bool) -> Self {
		self.retain_cookie = retain;
		self
	}

	pub fn chain(mut self, chain: EngineChain) -> Self {
		self.chain = Some(chain);
		self
	}
}

/// Immutable view of the session taken at the start of a call.
#[derive(Clone)]
pub struct SafeFetchConfig {
	pub identity: IdentityBuilder,
	pub cookies: BTreeMap<String, String>,
	pub proxies: ProxyPool,
	pub timeout: Duration,
	pub max_tries: usize,
	pub jitter: Duration,
	pub chain: EngineChain,
}

impl SafeFetchConfig {
	/// Headers for one attempt: session identity, then engine overrides,
	/// then `Host` (unless the identity names one), then the cookie jar.
	///
	/// Engine overrides are skipped when the session pins its own user
	/// agent. An override that swaps the user agent also drops any client
	/// hint it does not supply itself.
	pub fn headers_for(
		&self,
		engine: &dyn TransportEngine,
		url: &Url,
	) -> FetchResult<HeaderMap> {
		let mut headers = self.identity.to_header_map()?;
		if !self.identity.pins_user_agent() {
			let overrides = engine.header_overrides(url);
			if overrides.contains_key(USER_AGENT) {
				for hint in CLIENT_HINT_HEADERS {
					if !overrides.contains_key(*hint) {
						headers.remove(*hint);
					}
				}
			}
			for (name, value) in overrides.iter() {
				headers.insert(name.clone(), value.clone());
			}
		}
		if !self.identity.contains("host") {
			let authority = &url[Position::BeforeHost..Position::AfterPort];
			if let Ok(value) = HeaderValue::from_str(authority) {
				headers.insert(HOST, value);
			}
		}
		if let Some(cookie) = cookie_header_value(&self.cookies) {
			let value = HeaderValue::from_str(&cookie)
				.map_err(|_| IdentityError::InvalidValue("cookie".into()))?;
			headers.insert(COOKIE, value);
		}
		Ok(headers)
	}
}

/// Resilient fetcher: one session, many engines.
#[derive(Clone)]
pub struct SafeFetch {
	identity: IdentityBuilder,
	cookies: BTreeMap<String, String>,
	proxies: ProxyPool,
	timeout: Duration,
	max_tries: usize,
	jitter: Duration,
	chain: EngineChain,
	pool: WorkerPool,
	hooks: Vec<PostTryHook>,
	events: EventDispatcher,
}

impl Default for SafeFetch {
	fn default() -> Self {
		Self::new()
	}
}

impl SafeFetch {
	/// Orchestrator with the default identity and engine chain.
	pub fn new() -> Self {
		let pool = WorkerPool::default();
		Self {
			identity: IdentityBuilder::new(),
			cookies: BTreeMap::new(),
			proxies: ProxyPool::default(),
			timeout: Duration::from_secs(60),
			max_tries: DEFAULT_MAX_TRIES,
			jitter: Duration::from_secs(2),
			chain: default_chain(pool.clone()),
			pool,
			hooks: Vec::new(),
			events: EventDispatcher::with_logging(),
		}
	}

	pub fn from_settings(settings: &FetchSettings) -> Self {
		let pool = WorkerPool::new(settings.worker_permits);
		let mut fetch = Self {
			timeout: settings.timeout(),
			max_tries: settings.max_tries,
			jitter: settings.jitter(),
			chain: default_chain(pool.clone()),
			pool,
			..Self::new()
		};
		fetch.proxies(settings.proxies.iter().cloned());
		if let Some(class) = settings.user_agent {
			fetch.user_agent_random(class);
		}
		fetch.browser_endpoint(settings.browser_endpoint(), settings.browser_proxies.clone());
		fetch
	}

	pub fn identity(&self) -> &IdentityBuilder {
		&self.identity
	}

	pub fn identity_mut(&mut self) -> &mut IdentityBuilder {
		&mut self.identity
	}

	pub fn cookie_jar(&self) -> &BTreeMap<String, String> {
		&self.cookies
	}

	pub fn proxy_pool(&self) -> &ProxyPool {
		&self.proxies
	}

	pub fn worker_pool(&self) -> &WorkerPool {
		&self.pool
	}

	pub fn engine_kinds(&self) -> Vec<EngineKind> {
		self.chain.iter().map(|engine| engine.kind()).collect()
	}

	pub fn register_handler(&mut self, handler: Arc<dyn EventHandler>) -> &mut Self {
		self.events.register_handler(handler);
		self
	}

	/// Run `hook` before every attempt after the first.
	pub fn post_try<F>(&mut self, hook: F) -> &mut Self
	where
		F: Fn(&mut IdentityBuilder) + Send + Sync + 'static,
	{
		self.hooks.push(Arc::new(hook));
		self
	}

	pub fn header(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
		self.identity.header(name, value);
		self
	}

	pub fn headers<I, K, V>(&mut self, headers: I) -> &mut Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: Into<String>,
	{
		self.identity.headers(headers);
		self
	}

	pub fn remove_headers(&mut self, excepts: &[&str]) -> &mut Self {
		self.identity.remove_headers(excepts);
		self
	}

	pub fn accept_text_html(&mut self) -> &mut Self {
		self.identity.accept_text_html();
		self
	}

	pub fn accept_all(&mut self) -> &mut Self {
		self.identity.accept_all();
		self
	}

	pub fn accept_language(&mut self, language: impl Into<String>) -> &mut Self {
		self.identity.accept_language(language);
		self
	}

	pub fn accept_language_random(&mut self) -> &mut Self {
		self.identity.accept_language_random();
		self
	}

	pub fn accept_encoding(&mut self, encoding: impl Into<String>) -> &mut Self {
		self.identity.accept_encoding(encoding);
		self
	}

	pub fn user_agent(&mut self, agent: impl Into<String>) -> &mut Self {
		self.identity.user_agent(agent);
		self
	}

	pub fn user_agent_random(&mut self, class: DeviceClass) -> &mut Self {
		self.identity.user_agent_random(class);
		self
	}

	pub fn user_agent_one_of<S: AsRef<str>>(&mut self, agents: &[S]) -> &mut Self {
		self.identity.user_agent_one_of(agents);
		self
	}

	pub fn auth(&mut self, token: Option<&str>) -> &mut Self {
		self.identity.auth(token);
		self
	}

	pub fn keep_alive(&mut self) -> &mut Self {
		self.identity.keep_alive();
		self
	}

	pub fn connection(&mut self, connection: impl Into<String>) -> &mut Self {
		self.identity.connection(connection);
		self
	}

	pub fn content_type(&mut self, content_type: Option<&str>) -> &mut Self {
		self.identity.content_type(content_type);
		self
	}

	pub fn cache_control(&mut self, value: impl Into<String>) -> &mut Self {
		self.identity.cache_control(value);
		self
	}

	pub fn cache_control_no_cache(&mut self) -> &mut Self {
		self.identity.cache_control_no_cache();
		self
	}

	pub fn host(&mut self, host: impl Into<String>) -> &mut Self {
		self.identity.host(host);
		self
	}

	pub fn sec_fetch_dest(&mut self, value: impl Into<String>) -> &mut Self {
		self.identity.sec_fetch_dest(value);
		self
	}

	pub fn sec_fetch_dest_document(&mut self) -> &mut Self {
		self.identity.sec_fetch_dest_document();
		self
	}

	pub fn sec_fetch_mode(&mut self, value: impl Into<String>) -> &mut Self {
		self.identity.sec_fetch_mode(value);
		self
	}

	pub fn sec_fetch_mode_navigate(&mut self) -> &mut Self {
		self.identity.sec_fetch_mode_navigate();
		self
	}

	pub fn sec_fetch_user(&mut self, value: impl Into<String>) -> &mut Self {
		self.identity.sec_fetch_user(value);
		self
	}

	pub fn sec_fetch_site(&mut self, value: impl Into<String>) -> &mut Self {
		self.identity.sec_fetch_site(value);
		self
	}

	pub fn priority(&mut self, value: impl Into<String>) -> &mut Self {
		self.identity.priority(value);
		self
	}

	pub fn priority_u(&mut self) -> &mut Self {
		self.identity.priority_u();
		self
	}

	pub fn pragma(&mut self, value: impl Into<String>) -> &mut Self {
		self.identity.pragma(value);
		self
	}

	pub fn pragma_no_cache(&mut self) -> &mut Self {
		self.identity.pragma_no_cache();
		self
	}

	pub fn referer(&mut self, value: impl Into<String>) -> &mut Self {
		self.identity.referer(value);
		self
	}

	pub fn referer_no_referrer(&mut self) -> &mut Self {
		self.identity.referer_no_referrer();
		self
	}

	pub fn sec_ch_ua(&mut self, value: impl Into<String>) -> &mut Self {
		self.identity.sec_ch_ua(value);
		self
	}

	pub fn sec_ch_ua_mobile(&mut self, mobile: bool) -> &mut Self {
		self.identity.sec_ch_ua_mobile(mobile);
		self
	}

	pub fn sec_ch_ua_platform(&mut self, platform: impl Into<String>) -> &mut Self {
		self.identity.sec_ch_ua_platform(platform);
		self
	}

	pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
		self.timeout = timeout;
		self
	}

	/// Default attempt budget for calls that do not set their own.
	pub fn max_tries(&mut self, max_tries: usize) -> &mut Self {
		self.max_tries = max_tries;
		self
	}

	/// Upper bound of the random pause taken before each attempt.
	pub fn jitter(&mut self, max: Duration) -> &mut Self {
		self.jitter = max;
		self
	}

	/// Add one proxy candidate; `None` clears the list.
	pub fn proxy(&mut self, proxy: Option<&str>) -> &mut Self {
		match proxy {
			Some(proxy) => self.proxies.push(proxy),
			None => self.proxies.clear(),
		}
		self
	}

	pub fn proxies<I, S>(&mut self, proxies: I) -> &mut Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.proxies.set(proxies);
		self
	}

	pub fn proxies_csv(&mut self, raw: &str) -> &mut Self {
		self.proxies = ProxyPool::from_csv(raw);
		self
	}

	pub fn clear_proxies(&mut self) -> &mut Self {
		self.proxies.clear();
		self
	}

	pub fn cookie(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
		self.cookies.insert(name.into(), value.into());
		self
	}

	pub fn cookies<I, K, V>(&mut self, cookies: I) -> &mut Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		for (name, value) in cookies {
			self.cookies.insert(name.into(), value.into());
		}
		self
	}

	/// Merge a `Cookie`-header style string (`a=1; b=2`) into the jar.
	pub fn cookie_str(&mut self, raw: &str) -> &mut Self {
		self.cookies.extend(parse_cookie_str(raw));
		self
	}

	pub fn chain(&mut self, chain: EngineChain) -> &mut Self {
		self.chain = chain;
		self
	}

	/// Put a headless browser at the head of the chain, replacing any
	/// browser engine already there. A blank or missing endpoint only
	/// removes it.
	pub fn browser_endpoint(&mut self, endpoint: Option<&str>, proxies: Vec<String>) -> &mut Self {
		self.chain.retain(|engine| engine.kind() != EngineKind::Browser);
		let Some(endpoint) = endpoint.map(str::trim).filter(|endpoint| !endpoint.is_empty()) else {
			return self;
		};
		#[cfg(feature = "browser")]
		{
			let engine = crate::transport::BrowserEngine::remote(endpoint).with_proxies(proxies);
			self.chain.insert(0, Arc::new(engine));
		}
		#[cfg(not(feature = "browser"))]
		{
			let _ = proxies;
			log::warn!("browser endpoint {endpoint} ignored: built without the browser feature");
		}
		self
	}

	/// Freeze the session for one call.
	pub fn snapshot(&self, options: &RequestOptions) -> SafeFetchConfig {
		SafeFetchConfig {
			identity: self.identity.clone(),
			cookies: self.cookies.clone(),
			proxies: self.proxies.clone(),
			timeout: options.timeout.unwrap_or(self.timeout),
			max_tries: options.max_tries.unwrap_or(self.max_tries).max(1),
			jitter: self.jitter,
			chain: options.chain.clone().unwrap_or_else(|| self.chain.clone()),
		}
	}

	pub async fn get(&mut self, url: &str) -> FetchResult<FetchResponse> {
		self.request(Method::GET, url, RequestOptions::default()).await
	}

	/// Walk the engine chain once, sharing one attempt budget, and return
	/// the first engine success.
	///
	/// Cookies from the winning response join the jar when its status is at
	/// most 399, or always with `retain_cookie`. When nothing succeeds the
	/// first recorded error is raised if `raise_errors` is set; otherwise an
	/// unusable response is returned.
	pub async fn request(
		&mut self,
		method: Method,
		url: &str,
		options: RequestOptions,
	) -> FetchResult<FetchResponse> {
		let url = Url::parse(url)?;
		let mut config = self.snapshot(&options);
		let mut errors: Vec<TransportError> = Vec::new();
		let mut attempts = 0usize;

		let chain = config.chain.clone();
		if let Some(first) = chain.first() {
			config.headers_for(first.as_ref(), &url)?;
		}
		for engine in &chain {
			if attempts >= config.max_tries {
				break;
			}

			pause(config.jitter).await;
			if attempts > 0 {
				for hook in &self.hooks {
					hook(&mut config.identity);
				}
			}
			attempts += 1;

			let proxy = config.proxies.pick();
			let started = Instant::now();
			let outcome = match config.headers_for(engine.as_ref(), &url) {
				Ok(headers) => {
					let request = FetchRequest::new(method.clone(), url.clone())
						.with_headers(headers)
						.with_body(options.body.clone())
						.with_proxy(proxy.clone())
						.with_timeout(config.timeout);

					self.events.dispatch(FetchEvent::Attempt(AttemptEvent {
						url: url.clone(),
						method: method.clone(),
						engine: engine.kind(),
						engine_name: engine.name().to_string(),
						attempt: attempts,
						proxy,
						timestamp: chrono::Utc::now(),
					}));

					match tokio::time::timeout(config.timeout + ATTEMPT_GRACE, engine.execute(&request))
						.await
					{
						Ok(outcome) => outcome,
						Err(_) => Err(TransportError::Timeout(config.timeout)),
					}
				}
				// A hook left the identity unusable; this attempt is lost.
				Err(err) => Err(TransportError::Header(err.to_string())),
			};

			match outcome {
				Ok(response) => {
					let usable_status = response.status_code.is_some_and(|status| status <= 399);
					if usable_status || options.retain_cookie {
						self.cookies
							.extend(response.cookies.iter().map(|(k, v)| (k.clone(), v.clone())));
					}
					self.identity = config.identity;
					self.events.dispatch(FetchEvent::Success(SuccessEvent {
						url: url.clone(),
						engine: engine.kind(),
						engine_name: engine.name().to_string(),
						status: response.status_code,
						latency: started.elapsed(),
						timestamp: chrono::Utc::now(),
					}));
					return Ok(response);
				}
				Err(error) => {
					self.events.dispatch(FetchEvent::Failure(FailureEvent {
						url: url.clone(),
						engine: engine.kind(),
						engine_name: engine.name().to_string(),
						attempt: attempts,
						error: error.clone(),
						timestamp: chrono::Utc::now(),
					}));
					errors.push(error);
				}
			}
		}

		self.identity = config.identity;
		self.events.dispatch(FetchEvent::Exhausted(ExhaustedEvent {
			url: url.clone(),
			attempts,
			errors: errors.clone(),
			timestamp: chrono::Utc::now(),
		}));

		if options.raise_errors && !errors.is_empty() {
			let first = errors[0].clone();
			return Err(FetchError::Exhausted {
				first,
				attempts,
				errors,
			});
		}
		Ok(FetchResponse::unusable())
	}

	/// Like [`request`](Self::request) with errors raised, but an auth
	/// rejection triggers `reauth` once; the token it yields is installed
	/// with [`auth`](Self::auth) and the request is retried a single time.
	pub async fn request_with_reauth<F, Fut>(
		&mut self,
		method: Method,
		url: &str,
		options: RequestOptions,
		reauth: F,
	) -> FetchResult<FetchResponse>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Option<String>>,
	{
		let options = options.raise_errors(true);
		match self.request(method.clone(), url, options.clone()).await {
			Err(err) if err.is_auth() => {
				log::info!("authentication rejected for {url}, refreshing credentials");
				let Some(token) = reauth().await else {
					return Err(err);
				};
				self.auth(Some(&token));
				self.request(method, url, options).await
			}
			other => other,
		}
	}
}

async fn pause(max: Duration) {
	let millis = max.as_millis() as u64;
	if millis == 0 {
		return;
	}
	let delay = Duration::from_millis(rand::thread_rng().gen_range(0..millis));
	sleep(delay).await;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn options_default_budget() {
		let options = RequestOptions::default();
		assert_eq!(options.max_tries, None);
		assert_eq!(SafeFetch::new().snapshot(&options).max_tries, DEFAULT_MAX_TRIES);
		assert!(!options.raise_errors);
		assert!(!options.retain_cookie);
	}

	#[test]
	fn zero_budget_is_clamped() {
		let fetch = SafeFetch::new();
		let config = fetch.snapshot(&RequestOptions::new().max_tries(0));
		assert_eq!(config.max_tries, 1);
	}

	#[test]
	fn default_chain_order() {
		let fetch = SafeFetch::new();
		assert_eq!(
			fetch.engine_kinds(),
			vec![EngineKind::Impersonate, EngineKind::Async, EngineKind::Blocking]
		);
	}

	#[test]
	fn host_and_cookie_are_derived() {
		let mut fetch = SafeFetch::new();
		fetch.cookie("sid", "1").cookie_str("lang=ko; cur=KRW");
		let config = fetch.snapshot(&RequestOptions::default());
		let engine = crate::transport::AsyncEngine::new();
		let url = Url::parse("https://shop.example:8443/item?id=1").unwrap();
		let headers = config.headers_for(&engine, &url).unwrap();
		assert_eq!(headers[HOST], "shop.example:8443");
		assert_eq!(headers[COOKIE], "cur=KRW; lang=ko; sid=1");
	}

	#[test]
	fn explicit_host_wins_and_empty_jar_sends_no_cookie() {
		let mut fetch = SafeFetch::new();
		fetch.host("cdn.shop.example");
		let config = fetch.snapshot(&RequestOptions::default());
		let engine = crate::transport::AsyncEngine::new();
		let url = Url::parse("https://shop.example/").unwrap();
		let headers = config.headers_for(&engine, &url).unwrap();
		assert_eq!(headers[HOST], "cdn.shop.example");
		assert!(!headers.contains_key(COOKIE));
	}

	#[test]
	fn pinned_user_agent_survives_impersonation() {
		let mut fetch = SafeFetch::new();
		fetch
			.sec_ch_ua_platform("\"Android\"")
			.user_agent("MyApp/1.0 (Linux; Android 14) Mobile");
		let config = fetch.snapshot(&RequestOptions::default());
		let engine = crate::transport::ImpersonateEngine::new();
		let url = Url::parse("https://shop.example/item").unwrap();
		let headers = config.headers_for(&engine, &url).unwrap();
		assert_eq!(headers[USER_AGENT], "MyApp/1.0 (Linux; Android 14) Mobile");
		assert_eq!(headers["sec-ch-ua-mobile"], "?1");
		assert_eq!(headers["sec-ch-ua-platform"], "\"Android\"");
	}

	#[test]
	fn impersonated_agent_brings_only_its_own_client_hints() {
		let mut fetch = SafeFetch::new();
		fetch.sec_ch_ua("\"Chromium\";v=\"129\"").sec_ch_ua_platform("\"macOS\"");
		let config = fetch.snapshot(&RequestOptions::default());
		let engine = crate::transport::ImpersonateEngine::new();
		let url = Url::parse("https://shop.example/item").unwrap();
		let overrides = engine.header_overrides(&url);
		let headers = config.headers_for(&engine, &url).unwrap();
		assert_eq!(headers[USER_AGENT], overrides[USER_AGENT]);
		for hint in CLIENT_HINT_HEADERS {
			assert_eq!(headers.get(*hint), overrides.get(*hint), "{hint}");
		}
	}

	#[test]
	fn blank_browser_endpoint_leaves_chain() {
		let mut fetch = SafeFetch::new();
		fetch.browser_endpoint(Some("  "), Vec::new());
		assert_eq!(fetch.engine_kinds().len(), 3);
	}

	#[cfg(feature = "browser")]
	#[test]
	fn browser_endpoint_goes_first_once() {
		let mut fetch = SafeFetch::new();
		fetch.browser_endpoint(Some("http://chrome:9222"), Vec::new());
		fetch.browser_endpoint(Some("http://chrome:9223"), Vec::new());
		let kinds = fetch.engine_kinds();
		assert_eq!(kinds[0], EngineKind::Browser);
		assert_eq!(
			kinds.iter().filter(|kind| **kind == EngineKind::Browser).count(),
			1
		);
	}
}

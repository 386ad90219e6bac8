//! Proxy candidates: the per-request pool and the shared remote-list cache.
//!
//! [`ProxyPool`] is the small list an orchestrator picks from on every
//! attempt. [`ProxyCache`] aggregates public proxy lists from several
//! [`ProxySource`]s and refreshes them at most once per interval, with the
//! clock injected so staleness can be driven from tests.

pub mod sources;

use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

pub use sources::{ProxySource, TextListSource, default_sources};

pub const DEFAULT_REFRESH_MINUTES: i64 = 60;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("proxy list request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("proxy list {url} answered with status {status}")]
    Status { url: String, status: u16 },
}

/// Candidate proxies for one orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyPool {
    proxies: Vec<String>,
}

impl ProxyPool {
    pub fn new<I, S>(proxies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut pool = Self::default();
        pool.set(proxies);
        pool
    }

    /// Parse a comma separated list, ignoring blanks.
    pub fn from_csv(raw: &str) -> Self {
        Self::new(raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()))
    }

    pub fn set<I, S>(&mut self, proxies: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.proxies.clear();
        for proxy in proxies {
            self.push(proxy);
        }
    }

    pub fn push(&mut self, proxy: impl Into<String>) {
        let proxy = proxy.into();
        if !self.proxies.contains(&proxy) {
            self.proxies.push(proxy);
        }
    }

    pub fn clear(&mut self) {
        self.proxies.clear();
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.proxies
    }

    /// Uniform choice over the candidates plus "no proxy", so a direct
    /// connection is tried with probability 1/(n+1).
    pub fn pick(&self) -> Option<String> {
        let slot = rand::thread_rng().gen_range(0..=self.proxies.len());
        self.proxies.get(slot).cloned()
    }
}

/// Keep well-formed `[scheme://]host:port` entries, dropping `0.0.0.0` and
/// duplicates while preserving order.
pub fn sanitize_proxy_list<I, S>(entries: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter_map(|entry| {
            let entry = entry.as_ref().trim().trim_end_matches('/');
            is_valid_proxy(entry).then(|| entry.to_string())
        })
        .filter(|entry| seen.insert(entry.clone()))
        .collect()
}

fn is_valid_proxy(entry: &str) -> bool {
    let authority = entry
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(entry);
    let Some((host, port)) = authority.split_once(':') else {
        return false;
    };
    if host.is_empty() || host == "0.0.0.0" || host.contains(['/', '@', ' ']) {
        return false;
    }
    matches!(port.parse::<u16>(), Ok(port) if port >= 1)
}

/// Time source for cache staleness checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: ChronoDuration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Default)]
struct CacheState {
    proxies: Vec<String>,
    updated_at: Option<DateTime<Utc>>,
}

/// Aggregated proxy list refreshed from remote sources on a fixed interval.
pub struct ProxyCache {
    sources: Vec<Arc<dyn ProxySource>>,
    clock: Arc<dyn Clock>,
    interval: ChronoDuration,
    state: RwLock<CacheState>,
}

impl ProxyCache {
    pub fn new(sources: Vec<Arc<dyn ProxySource>>) -> Self {
        Self {
            sources,
            clock: Arc::new(SystemClock),
            interval: ChronoDuration::minutes(DEFAULT_REFRESH_MINUTES),
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Cache over the built-in public lists. Build one at startup and share
    /// it behind an `Arc`.
    pub fn with_default_sources() -> Self {
        Self::new(default_sources())
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_interval(mut self, interval: ChronoDuration) -> Self {
        self.interval = interval;
        self
    }

    pub fn is_stale(&self) -> bool {
        let updated_at = self.read_state(|state| state.updated_at);
        match updated_at {
            Some(at) => self.clock.now() - at > self.interval,
            None => true,
        }
    }

    /// Re-fetch every source when the cache is older than the interval.
    /// Returns whether a refresh ran. A failing source is logged and skipped.
    pub async fn refresh_if_stale(&self) -> bool {
        if !self.is_stale() {
            return false;
        }
        // Stamp first so overlapping callers see a fresh cache.
        self.write_state(|state| state.updated_at = Some(self.clock.now()));

        let mut fetched = Vec::new();
        for source in &self.sources {
            match source.fetch().await {
                Ok(list) => {
                    log::debug!("proxy source {} returned {} entries", source.name(), list.len());
                    fetched.extend(list);
                }
                Err(err) => log::warn!("proxy source {} failed: {err}", source.name()),
            }
        }

        let total = self.write_state(|state| {
            let merged = sanitize_proxy_list(state.proxies.iter().chain(fetched.iter()));
            state.proxies = merged;
            state.proxies.len()
        });
        log::info!("proxy cache refreshed, {total} proxies available");
        true
    }

    pub fn random(&self) -> Option<String> {
        self.read_state(|state| state.proxies.choose(&mut rand::thread_rng()).cloned())
    }

    /// Refresh if needed, then pick one proxy.
    pub async fn get_proxy(&self) -> Option<String> {
        self.refresh_if_stale().await;
        self.random()
    }

    pub fn all(&self) -> Vec<String> {
        self.read_state(|state| state.proxies.clone())
    }

    pub fn len(&self) -> usize {
        self.read_state(|state| state.proxies.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_state<T>(&self, f: impl FnOnce(&CacheState) -> T) -> T {
        let guard = self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&guard)
    }

    fn write_state<T>(&self, f: impl FnOnce(&mut CacheState) -> T) -> T {
        let mut guard = self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

//! Settings module
//!
//! Serializable knobs for building a [`SafeFetch`](crate::SafeFetch):
//! - attempt budget and per-attempt timeout
//! - inter-attempt jitter
//! - proxies and the optional remote browser
//! - worker pool size and proxy cache refresh interval
//!
//! Every field has a default, so partial JSON documents are accepted.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::modules::identity::DeviceClass;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid settings document: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub max_tries: usize,
    pub jitter_max_ms: u64,
    pub worker_permits: usize,
    pub proxies: Vec<String>,
    pub browser_endpoint: Option<String>,
    pub browser_proxies: Vec<String>,
    /// Draw a random user agent of this class at construction. `None`
    /// keeps the default desktop Chrome identity.
    pub user_agent: Option<DeviceClass>,
    pub proxy_refresh_minutes: i64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            max_tries: 10,
            jitter_max_ms: 2_000,
            worker_permits: 4,
            proxies: Vec::new(),
            browser_endpoint: None,
            browser_proxies: Vec::new(),
            user_agent: None,
            proxy_refresh_minutes: crate::modules::proxy::DEFAULT_REFRESH_MINUTES,
        }
    }
}

impl FetchSettings {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn jitter(&self) -> Duration {
        Duration::from_millis(self.jitter_max_ms)
    }

    pub fn refresh_interval(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.proxy_refresh_minutes.max(1))
    }

    /// Browser endpoint with blank values treated as absent.
    pub fn browser_endpoint(&self) -> Option<&str> {
        self.browser_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_keeps_defaults() {
        let settings = FetchSettings::from_json_str(
            r#"{"max_tries": 3, "proxies": ["http://1.2.3.4:8080"], "user_agent": "mobile"}"#,
        )
        .unwrap();
        assert_eq!(settings.max_tries, 3);
        assert_eq!(settings.timeout(), Duration::from_secs(60));
        assert_eq!(settings.jitter(), Duration::from_secs(2));
        assert_eq!(settings.worker_permits, 4);
        assert_eq!(settings.user_agent, Some(DeviceClass::Mobile));
        assert_eq!(settings.refresh_interval(), chrono::Duration::minutes(60));
    }

    #[test]
    fn blank_browser_endpoint_is_absent() {
        let settings = FetchSettings {
            browser_endpoint: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(settings.browser_endpoint(), None);
    }

    #[test]
    fn rejects_malformed_document() {
        assert!(FetchSettings::from_json_str("{max_tries: 3").is_err());
    }
}

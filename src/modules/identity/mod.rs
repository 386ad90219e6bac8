//! Request identity: the header set a fetch presents to the remote site.
//!
//! [`IdentityBuilder`] holds the baseline browser headers and the setters the
//! orchestrator delegates to. Header names are stored lowercase so lookups
//! are case-insensitive. Nothing here performs I/O.

use std::collections::BTreeMap;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ACCEPT_TEXT_HTML: &str = "text/html,application/json,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9,ko;q=0.8,ja;q=0.7,zh-CN;q=0.6,zh;q=0.5";
pub const DEFAULT_ACCEPT_ENCODING: &str = "gzip, deflate, br, zstd";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36";

const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US",
    "en-US,en;q=0.9",
    "en-US,en;q=0.9,ko;q=0.8",
    "en-US,en;q=0.9,ko;q=0.8,ja;q=0.7",
    "en-US,en;q=0.9,ko;q=0.8,ja;q=0.7,zh-CN;q=0.6",
    "en-US,en;q=0.9,ko;q=0.8,ja;q=0.7,zh-CN;q=0.6,zh;q=0.5",
    "en",
    "ko",
    "ko-KR",
    "ja",
];

const DESKTOP_AGENTS: &[&str] = &[
    DEFAULT_USER_AGENT,
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36 Edg/129.0.0.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:131.0) Gecko/20100101 Firefox/131.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36",
];

const MOBILE_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Linux; Android 14; SM-S918N) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 18_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) CriOS/129.0.6668.69 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (iPad; CPU OS 17_5 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Mobile/15E148 Safari/604.1",
];

const BOT_AGENTS: &[&str] = &[
    "Mozilla/5.0 (compatible; NaverBot/1.0; http://help.naver.com/customer_webtxt_02.jsp)",
    "Mozilla/5.0 (compatible; Yeti/1.1; +http://naver.me/spd)",
    "Mozilla/5.0 (Linux; Android 6.0.1; Nexus 5X Build/MMB29P) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/W.X.Y.Z Mobile Safari/537.36 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)",
    "HTTPie/3.2.4",
];

/// Headers that describe the browser and must agree with the user agent.
pub const CLIENT_HINT_HEADERS: &[&str] = &["sec-ch-ua", "sec-ch-ua-mobile", "sec-ch-ua-platform"];

const DESKTOP_PLATFORMS: &[&str] = &["windows", "macos", "linux", "chrome os"];
const MOBILE_PLATFORMS: &[&str] = &["android", "ios"];

/// Crawler identities some sites serve simplified pages to.
pub fn bot_agents() -> Vec<String> {
    BOT_AGENTS.iter().map(|agent| agent.to_string()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Mobile,
    Desktop,
    #[default]
    Any,
}

impl DeviceClass {
    /// Guess the device class from a user-agent string.
    pub fn of_user_agent(agent: &str) -> DeviceClass {
        let lower = agent.to_ascii_lowercase();
        if ["mobile", "android", "iphone", "ipad"]
            .iter()
            .any(|marker| lower.contains(marker))
        {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }

    fn catalogue(&self) -> Vec<&'static str> {
        match self {
            DeviceClass::Mobile => MOBILE_AGENTS.to_vec(),
            DeviceClass::Desktop => DESKTOP_AGENTS.to_vec(),
            DeviceClass::Any => DESKTOP_AGENTS.iter().chain(MOBILE_AGENTS).copied().collect(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("invalid header name '{0}'")]
    InvalidName(String),
    #[error("invalid value for header '{0}'")]
    InvalidValue(String),
}

/// Mutable header set with browser-like defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityBuilder {
    headers: BTreeMap<String, String>,
}

impl Default for IdentityBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityBuilder {
    /// Baseline header set of a desktop Chrome navigation.
    pub fn new() -> Self {
        let mut builder = Self::empty();
        builder
            .accept_text_html()
            .accept_language(DEFAULT_ACCEPT_LANGUAGE)
            .accept_encoding(DEFAULT_ACCEPT_ENCODING)
            .user_agent(DEFAULT_USER_AGENT)
            .cache_control("max-age=0")
            .content_type(Some("application/json"))
            .connection("close")
            .sec_fetch_dest_document()
            .sec_fetch_mode_navigate()
            .priority_u()
            .pragma_no_cache();
        builder
    }

    pub fn empty() -> Self {
        Self {
            headers: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.headers.contains_key(&name.to_ascii_lowercase())
    }

    /// True when the caller chose a user agent other than the baseline one.
    pub fn pins_user_agent(&self) -> bool {
        self.get("user-agent")
            .is_some_and(|agent| agent != DEFAULT_USER_AGENT)
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn header(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn remove(&mut self, name: &str) -> &mut Self {
        self.headers.remove(&name.to_ascii_lowercase());
        self
    }

    /// Merge a batch of headers; later entries win.
    pub fn headers<I, K, V>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self.header(name.as_ref(), value);
        }
        self
    }

    /// Drop every header except those named in `excepts`.
    pub fn remove_headers(&mut self, excepts: &[&str]) -> &mut Self {
        let keep: Vec<String> = excepts.iter().map(|name| name.to_ascii_lowercase()).collect();
        self.headers.retain(|name, _| keep.contains(name));
        self
    }

    pub fn accept_text_html(&mut self) -> &mut Self {
        self.header("accept", ACCEPT_TEXT_HTML)
    }

    pub fn accept_all(&mut self) -> &mut Self {
        self.header("accept", "*/*")
    }

    pub fn accept_language(&mut self, language: impl Into<String>) -> &mut Self {
        self.header("accept-language", language)
    }

    pub fn accept_language_random(&mut self) -> &mut Self {
        let language = ACCEPT_LANGUAGES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(DEFAULT_ACCEPT_LANGUAGE);
        self.accept_language(language)
    }

    pub fn accept_encoding(&mut self, encoding: impl Into<String>) -> &mut Self {
        self.header("accept-encoding", encoding)
    }

    /// Set an explicit user agent and align the client-hint headers with it.
    pub fn user_agent(&mut self, agent: impl Into<String>) -> &mut Self {
        let agent = agent.into();
        let class = DeviceClass::of_user_agent(&agent);
        self.header("user-agent", agent);
        self.align_client_hints(class)
    }

    pub fn user_agent_random(&mut self, class: DeviceClass) -> &mut Self {
        let catalogue = class.catalogue();
        match catalogue.choose(&mut rand::thread_rng()) {
            Some(agent) => self.user_agent(*agent),
            None => self,
        }
    }

    /// Pick one of the given agents at random. An empty list is a no-op.
    pub fn user_agent_one_of<S: AsRef<str>>(&mut self, agents: &[S]) -> &mut Self {
        match agents.choose(&mut rand::thread_rng()) {
            Some(agent) => self.user_agent(agent.as_ref()),
            None => self,
        }
    }

    fn align_client_hints(&mut self, class: DeviceClass) -> &mut Self {
        let platform = self
            .get("sec-ch-ua-platform")
            .map(|value| value.trim_matches('"').to_ascii_lowercase());
        match class {
            DeviceClass::Mobile => {
                self.header("sec-ch-ua-mobile", "?1");
                if platform.is_some_and(|p| DESKTOP_PLATFORMS.contains(&p.as_str())) {
                    self.remove("sec-ch-ua-platform");
                }
            }
            _ => {
                self.header("sec-ch-ua-mobile", "?0");
                if platform.is_some_and(|p| MOBILE_PLATFORMS.contains(&p.as_str())) {
                    self.remove("sec-ch-ua-platform");
                }
            }
        }
        self
    }

    /// `Some(token)` sends `Authorization: Bearer token`; `None` clears it.
    pub fn auth(&mut self, token: Option<&str>) -> &mut Self {
        match token {
            Some(token) => self.header("authorization", format!("Bearer {token}")),
            None => self.remove("authorization"),
        }
    }

    pub fn connection(&mut self, connection: impl Into<String>) -> &mut Self {
        self.header("connection", connection)
    }

    pub fn keep_alive(&mut self) -> &mut Self {
        self.connection("keep-alive")
    }

    pub fn content_type(&mut self, content_type: Option<&str>) -> &mut Self {
        match content_type {
            Some(value) => self.header("content-type", value),
            None => self.remove("content-type"),
        }
    }

    pub fn cache_control(&mut self, value: impl Into<String>) -> &mut Self {
        self.header("cache-control", value)
    }

    pub fn cache_control_no_cache(&mut self) -> &mut Self {
        self.cache_control("no-cache")
    }

    pub fn host(&mut self, host: impl Into<String>) -> &mut Self {
        self.header("host", host)
    }

    pub fn sec_fetch_dest(&mut self, value: impl Into<String>) -> &mut Self {
        self.header("sec-fetch-dest", value)
    }

    pub fn sec_fetch_dest_document(&mut self) -> &mut Self {
        self.sec_fetch_dest("document")
    }

    pub fn sec_fetch_mode(&mut self, value: impl Into<String>) -> &mut Self {
        self.header("sec-fetch-mode", value)
    }

    pub fn sec_fetch_mode_navigate(&mut self) -> &mut Self {
        self.sec_fetch_mode("navigate")
    }

    pub fn sec_fetch_user(&mut self, value: impl Into<String>) -> &mut Self {
        self.header("sec-fetch-user", value)
    }

    pub fn sec_fetch_site(&mut self, value: impl Into<String>) -> &mut Self {
        self.header("sec-fetch-site", value)
    }

    pub fn priority(&mut self, value: impl Into<String>) -> &mut Self {
        self.header("priority", value)
    }

    pub fn priority_u(&mut self) -> &mut Self {
        self.priority("u=0, i")
    }

    pub fn pragma(&mut self, value: impl Into<String>) -> &mut Self {
        self.header("pragma", value)
    }

    pub fn pragma_no_cache(&mut self) -> &mut Self {
        self.pragma("no-cache")
    }

    pub fn referer(&mut self, value: impl Into<String>) -> &mut Self {
        self.header("referer", value)
    }

    pub fn referer_no_referrer(&mut self) -> &mut Self {
        self.referer("no-referrer")
    }

    pub fn sec_ch_ua(&mut self, value: impl Into<String>) -> &mut Self {
        self.header("sec-ch-ua", value)
    }

    pub fn sec_ch_ua_mobile(&mut self, mobile: bool) -> &mut Self {
        self.header("sec-ch-ua-mobile", if mobile { "?1" } else { "?0" })
    }

    pub fn sec_ch_ua_platform(&mut self, platform: impl Into<String>) -> &mut Self {
        self.header("sec-ch-ua-platform", platform)
    }

    /// Convert into a wire header map, validating every name and value.
    pub fn to_header_map(&self) -> Result<HeaderMap, IdentityError> {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let header = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| IdentityError::InvalidName(name.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| IdentityError::InvalidValue(name.clone()))?;
            map.insert(header, value);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_headers_present() {
        let identity = IdentityBuilder::new();
        for name in [
            "Accept",
            "Accept-Language",
            "Accept-Encoding",
            "User-Agent",
            "Cache-Control",
            "Connection",
            "Content-Type",
            "Sec-Fetch-Dest",
            "Sec-Fetch-Mode",
            "Priority",
            "Pragma",
        ] {
            assert!(identity.contains(name), "missing {name}");
        }
        assert_eq!(identity.get("connection"), Some("close"));
        assert_eq!(identity.get("PRIORITY"), Some("u=0, i"));
    }

    #[test]
    fn only_non_baseline_agents_are_pinned() {
        let mut identity = IdentityBuilder::new();
        assert!(!identity.pins_user_agent());
        identity.user_agent("MyApp/1.0");
        assert!(identity.pins_user_agent());
        identity.remove("user-agent");
        assert!(!identity.pins_user_agent());
    }

    #[test]
    fn explicit_setters_are_idempotent() {
        let mut once = IdentityBuilder::new();
        once.user_agent("agent/1").referer("https://a.example").keep_alive();
        let mut twice = once.clone();
        twice.user_agent("agent/1").referer("https://a.example").keep_alive();
        assert_eq!(once, twice);
    }

    #[test]
    fn mobile_agent_drops_desktop_platform() {
        let mut identity = IdentityBuilder::new();
        identity.sec_ch_ua_platform("\"Windows\"");
        identity.user_agent_random(DeviceClass::Mobile);
        assert_eq!(identity.get("sec-ch-ua-mobile"), Some("?1"));
        assert!(!identity.contains("sec-ch-ua-platform"));
    }

    #[test]
    fn desktop_agent_drops_mobile_platform() {
        let mut identity = IdentityBuilder::new();
        identity.sec_ch_ua_mobile(true).sec_ch_ua_platform("\"Android\"");
        identity.user_agent_random(DeviceClass::Desktop);
        assert_eq!(identity.get("sec-ch-ua-mobile"), Some("?0"));
        assert!(!identity.contains("sec-ch-ua-platform"));
    }

    #[test]
    fn random_language_comes_from_catalogue() {
        let mut identity = IdentityBuilder::new();
        identity.accept_language_random();
        let language = identity.get("accept-language").unwrap();
        assert!(ACCEPT_LANGUAGES.contains(&language));
    }

    #[test]
    fn auth_sets_and_clears_bearer() {
        let mut identity = IdentityBuilder::new();
        identity.auth(Some("t0k"));
        assert_eq!(identity.get("authorization"), Some("Bearer t0k"));
        identity.auth(None);
        assert!(!identity.contains("authorization"));
    }

    #[test]
    fn remove_headers_keeps_exceptions() {
        let mut identity = IdentityBuilder::new();
        identity.remove_headers(&["User-Agent"]);
        assert_eq!(identity.len(), 1);
        assert!(identity.contains("user-agent"));
    }

    #[test]
    fn header_map_rejects_bad_values() {
        let mut identity = IdentityBuilder::empty();
        identity.header("x-bad", "line\nbreak");
        assert_eq!(
            identity.to_header_map().unwrap_err(),
            IdentityError::InvalidValue("x-bad".into())
        );
        let mut identity = IdentityBuilder::new();
        identity.user_agent_one_of(&bot_agents());
        let map = identity.to_header_map().unwrap();
        assert!(BOT_AGENTS.contains(&map["user-agent"].to_str().unwrap()));
    }
}

//! Browser TLS profile rotation.
//!
//! Supplies browser profiles (JA3 label, ALPN, client-hint headers) plus
//! per-domain rotation so the impersonating engine presents a coherent,
//! changing browser identity.

use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrowserType {
    Chrome,
    Firefox,
    Safari,
    MobileChrome,
    MobileSafari,
}

impl BrowserType {
    pub fn is_mobile(&self) -> bool {
        matches!(self, BrowserType::MobileChrome | BrowserType::MobileSafari)
    }
}

#[derive(Debug, Clone)]
pub struct BrowserProfile {
    pub browser: BrowserType,
    pub ja3: String,
    pub user_agent: String,
    pub sec_ch_ua: Option<String>,
    pub platform: Option<String>,
    pub alpn_protocols: Vec<String>,
}

impl BrowserProfile {
    pub fn supports_http2(&self) -> bool {
        self.alpn_protocols.iter().any(|proto| proto == "h2")
    }

    /// Headers that must travel together with this profile's ClientHello.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![("user-agent", self.user_agent.clone())];
        if let Some(ref brands) = self.sec_ch_ua {
            headers.push(("sec-ch-ua", brands.clone()));
            headers.push((
                "sec-ch-ua-mobile",
                if self.browser.is_mobile() { "?1" } else { "?0" }.to_string(),
            ));
            if let Some(ref platform) = self.platform {
                headers.push(("sec-ch-ua-platform", format!("\"{platform}\"")));
            }
        }
        headers
    }
}

#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub preferred_browser: BrowserType,
    pub rotation_interval: usize,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            preferred_browser: BrowserType::Chrome,
            rotation_interval: 5,
        }
    }
}

#[derive(Debug)]
struct DomainTlsState {
    profile_index: usize,
    requests_since_rotation: usize,
}

/// Per-domain profile selection with periodic and on-demand rotation.
#[derive(Debug)]
pub struct TlsProfileManager {
    config: TlsConfig,
    profiles: Vec<BrowserProfile>,
    per_domain: HashMap<String, DomainTlsState>,
}

impl TlsProfileManager {
    pub fn new(config: TlsConfig) -> Self {
        let mut profiles = build_default_profiles();
        if let Some(pos) = profiles
            .iter()
            .position(|p| p.browser == config.preferred_browser)
        {
            profiles.swap(0, pos);
        }
        Self {
            config,
            profiles,
            per_domain: HashMap::new(),
        }
    }

    fn domain_state_mut(&mut self, domain: &str) -> &mut DomainTlsState {
        let len = self.profiles.len();
        self.per_domain
            .entry(domain.to_string())
            .or_insert_with(|| DomainTlsState {
                // New domains start on the preferred profile most of the time.
                profile_index: if rand::thread_rng().gen_bool(0.5) {
                    0
                } else {
                    rand::thread_rng().gen_range(0..len)
                },
                requests_since_rotation: 0,
            })
    }

    /// Profile currently assigned to `domain`, without counting a request.
    pub fn profile_for(&mut self, domain: &str) -> BrowserProfile {
        let index = self.domain_state_mut(domain).profile_index;
        self.profiles[index].clone()
    }

    /// Count one request for `domain`, rotating after the configured interval.
    pub fn record_request(&mut self, domain: &str) {
        let interval = self.config.rotation_interval.max(1);
        let should_rotate = {
            let state = self.domain_state_mut(domain);
            state.requests_since_rotation += 1;
            state.requests_since_rotation >= interval
        };
        if should_rotate {
            self.rotate_profile(domain);
        }
    }

    /// Switch `domain` to a different profile, e.g. after a challenge page.
    pub fn rotate_profile(&mut self, domain: &str) {
        let profiles_len = self.profiles.len();
        let current_index = {
            let state = self.domain_state_mut(domain);
            state.requests_since_rotation = 0;
            state.profile_index
        };

        if profiles_len <= 1 {
            return;
        }

        let candidates: Vec<usize> = (0..profiles_len)
            .filter(|idx| *idx != current_index)
            .collect();
        if let Some(next_index) = candidates.choose(&mut rand::thread_rng()).copied() {
            self.domain_state_mut(domain).profile_index = next_index;
        }
    }

    pub fn add_custom_profile(&mut self, profile: BrowserProfile) {
        self.profiles.push(profile);
    }
}

impl Default for TlsProfileManager {
    fn default() -> Self {
        Self::new(TlsConfig::default())
    }
}

fn build_default_profiles() -> Vec<BrowserProfile> {
    vec![
        BrowserProfile {
            browser: BrowserType::Chrome,
            ja3: "771,4865-4866-4867-49195-49199-49196-49200-52393-52392,0-23-65281-10-11-35-16-5-13-18-51-45-43-27-17513,29-23-24,0".into(),
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36".into(),
            sec_ch_ua: Some("\"Google Chrome\";v=\"129\", \"Not=A?Brand\";v=\"8\", \"Chromium\";v=\"129\"".into()),
            platform: Some("macOS".into()),
            alpn_protocols: vec!["h2".into(), "http/1.1".into()],
        },
        BrowserProfile {
            browser: BrowserType::Firefox,
            ja3: "771,4865-4867-4866-49195-49199-52393-52392-49196-49200,0-23-65281-10-11-35-16-5-34-51-43-13-45-28-21,29-23-24-25-256-257,0".into(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:131.0) Gecko/20100101 Firefox/131.0".into(),
            sec_ch_ua: None,
            platform: Some("Windows".into()),
            alpn_protocols: vec!["h2".into(), "http/1.1".into()],
        },
        BrowserProfile {
            browser: BrowserType::Safari,
            ja3: "771,4865-4866-4867-49196-49195-52393-49200-49199-52392,0-23-65281-10-11-16-5-13-18-51-45-43-27-21,29-23-24-25,0".into(),
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Safari/605.1.15".into(),
            sec_ch_ua: None,
            platform: Some("macOS".into()),
            alpn_protocols: vec!["h2".into(), "http/1.1".into()],
        },
        BrowserProfile {
            browser: BrowserType::MobileChrome,
            ja3: "771,4865-4866-4867-49195-49199-49196-49200-52393-52392,0-23-65281-10-11-35-16-5-13-18-51-45-43-27,29-23-24,0".into(),
            user_agent: "Mozilla/5.0 (Linux; Android 14; SM-S918N) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Mobile Safari/537.36".into(),
            sec_ch_ua: Some("\"Chromium\";v=\"130\", \"Google Chrome\";v=\"130\", \"Not?A_Brand\";v=\"99\"".into()),
            platform: Some("Android".into()),
            alpn_protocols: vec!["h2".into(), "http/1.1".into()],
        },
        BrowserProfile {
            browser: BrowserType::MobileSafari,
            ja3: "771,4865-4866-4867-49196-49195-52393-49200-49199-52392,0-23-65281-10-11-16-5-13-18-51-45-43-27,29-23-24-25,0".into(),
            user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.6 Mobile/15E148 Safari/604.1".into(),
            sec_ch_ua: None,
            platform: Some("iOS".into()),
            alpn_protocols: vec!["http/1.1".into()],
        },
    ]
}

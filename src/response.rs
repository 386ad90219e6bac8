//! Normalised fetch result shared by every transport engine.
//!
//! Engines fold their stack-specific response objects into a
//! [`FetchResponse`]: status, body text, cookies lifted from `Set-Cookie`,
//! and an optional bearer token echoed back in `Authorization`.

use std::collections::BTreeMap;

use http::HeaderMap;
use http::header::{AUTHORIZATION, SET_COOKIE};

/// Response returned by the orchestrator and by individual engines.
///
/// A default value is the "unusable" response: no status, no body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResponse {
    pub status_code: Option<u16>,
    pub text: Option<String>,
    pub cookies: BTreeMap<String, String>,
    pub access_token: Option<String>,
}

impl FetchResponse {
    pub fn new(status: u16, text: impl Into<String>) -> Self {
        Self {
            status_code: Some(status),
            text: Some(text.into()),
            cookies: BTreeMap::new(),
            access_token: None,
        }
    }

    /// Placeholder handed back when every attempt failed silently.
    pub fn unusable() -> Self {
        Self::default()
    }

    /// Build a response from raw parts, extracting cookies and bearer token
    /// from the response headers.
    pub fn from_parts(status: u16, headers: &HeaderMap, body: String) -> Self {
        Self {
            status_code: Some(status),
            text: Some(body),
            cookies: cookies_from_headers(headers),
            access_token: bearer_token(headers),
        }
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// True when a transport produced a status ≤ 399 and a non-empty body.
    pub fn has(&self) -> bool {
        matches!(self.status_code, Some(status) if status <= 399)
            && self.text.as_deref().is_some_and(|text| !text.is_empty())
    }

    /// Soft "not found" signal, distinct from a transport failure.
    pub fn is_not_found(&self) -> bool {
        self.status_code == Some(404)
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Body decoded as JSON, `None` when absent or malformed.
    pub fn json(&self) -> Option<serde_json::Value> {
        self.text
            .as_deref()
            .and_then(|text| serde_json::from_str(text).ok())
    }
}

/// Collect `name=value` pairs from every `Set-Cookie` header.
pub fn cookies_from_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(parse_set_cookie)
        .collect()
}

/// Parse the leading `name=value` of a `Set-Cookie` header, ignoring attributes.
pub fn parse_set_cookie(raw: &str) -> Option<(String, String)> {
    let pair = raw.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().trim_matches('"').to_string()))
}

/// Parse a request-style cookie string (`a=1; b=2`).
pub fn parse_cookie_str(raw: &str) -> BTreeMap<String, String> {
    raw.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Serialise a jar into a `Cookie` header value; `None` for an empty jar.
pub fn cookie_header_value(jar: &BTreeMap<String, String>) -> Option<String> {
    if jar.is_empty() {
        return None;
    }
    Some(
        jar.iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// Token from an `Authorization: Bearer …` response header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = raw
        .strip_prefix("Bearer ")
        .or_else(|| raw.strip_prefix("bearer "))
        .unwrap_or(raw)
        .trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn has_requires_status_and_body() {
        assert!(FetchResponse::new(200, "ok").has());
        assert!(FetchResponse::new(302, "moved").has());
        assert!(!FetchResponse::new(200, "").has());
        assert!(!FetchResponse::new(404, "missing").has());
        assert!(!FetchResponse::new(500, "boom").has());
        assert!(!FetchResponse::unusable().has());
    }

    #[test]
    fn not_found_is_distinct_from_unusable() {
        let response = FetchResponse::new(404, "");
        assert!(response.is_not_found());
        assert!(!FetchResponse::unusable().is_not_found());
    }

    #[test]
    fn extracts_cookies_and_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("sid=xyz; Path=/; HttpOnly"));
        headers.append(SET_COOKIE, HeaderValue::from_static("lang=\"ko\"; Secure"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));

        let response = FetchResponse::from_parts(200, &headers, "{}".into());
        assert_eq!(response.cookies.get("sid").map(String::as_str), Some("xyz"));
        assert_eq!(response.cookies.get("lang").map(String::as_str), Some("ko"));
        assert_eq!(response.access_token.as_deref(), Some("abc.def"));
    }

    #[test]
    fn json_is_none_for_html() {
        assert!(FetchResponse::new(200, "<html></html>").json().is_none());
        let json = FetchResponse::new(200, r#"{"price": 1200}"#).json().unwrap();
        assert_eq!(json["price"], 1200);
    }

    #[test]
    fn cookie_header_round_trip() {
        let jar = parse_cookie_str("a=1; b = 2 ;broken; =skip");
        assert_eq!(jar.len(), 2);
        assert_eq!(cookie_header_value(&jar).as_deref(), Some("a=1; b=2"));
        assert_eq!(cookie_header_value(&BTreeMap::new()), None);
    }
}

//! Remote proxy list providers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{ProxyError, sanitize_proxy_list};

/// A provider of candidate proxies.
#[async_trait]
pub trait ProxySource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<String>, ProxyError>;
}

/// Plain-text lists, one `host:port` per line.
///
/// Each list carries the scheme its entries are prefixed with; entries that
/// already name a scheme are kept as-is. Any list failing fails the source.
#[derive(Debug, Clone)]
pub struct TextListSource {
    name: String,
    lists: Vec<(String, Option<String>)>,
    timeout: Duration,
}

impl TextListSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lists: Vec::new(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn list(mut self, url: impl Into<String>, scheme: Option<&str>) -> Self {
        self.lists.push((url.into(), scheme.map(str::to_string)));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn download(&self, client: &Client, url: &str) -> Result<String, ProxyError> {
        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

fn with_scheme(line: &str, scheme: Option<&str>) -> String {
    let line = line.trim();
    match scheme {
        Some(scheme) if !line.contains("://") => format!("{scheme}://{line}"),
        _ => line.to_string(),
    }
}

#[async_trait]
impl ProxySource for TextListSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<String>, ProxyError> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(self.timeout)
            .build()?;

        let mut entries = Vec::new();
        for (url, scheme) in &self.lists {
            let body = self.download(&client, url).await?;
            entries.extend(
                body.lines()
                    .filter(|line| !line.trim().is_empty())
                    .map(|line| with_scheme(line, scheme.as_deref())),
            );
        }
        Ok(sanitize_proxy_list(entries))
    }
}

/// Public lists the price tracker has historically drawn from.
pub fn default_sources() -> Vec<Arc<dyn ProxySource>> {
    vec![
        Arc::new(TextListSource::new("proxyscrape").list(
            "https://api.proxyscrape.com/v2/?request=getproxies&protocol=http&timeout=10000&country=all&ssl=all&anonymity=all",
            Some("http"),
        )),
        Arc::new(
            TextListSource::new("ercindedeoglu")
                .list("https://raw.githubusercontent.com/ErcinDedeoglu/proxies/refs/heads/main/proxies/http.txt", Some("http"))
                .list("https://raw.githubusercontent.com/ErcinDedeoglu/proxies/refs/heads/main/proxies/https.txt", Some("https"))
                .list("https://raw.githubusercontent.com/ErcinDedeoglu/proxies/refs/heads/main/proxies/socks5.txt", Some("socks5")),
        ),
        Arc::new(
            TextListSource::new("kangproxy")
                .list("https://raw.githubusercontent.com/officialputuid/KangProxy/refs/heads/KangProxy/http/http.txt", Some("http"))
                .list("https://raw.githubusercontent.com/officialputuid/KangProxy/refs/heads/KangProxy/https/https.txt", Some("https"))
                .list("https://raw.githubusercontent.com/officialputuid/KangProxy/refs/heads/KangProxy/socks5/socks5.txt", Some("socks5")),
        ),
        Arc::new(
            TextListSource::new("vakhov")
                .list("https://raw.githubusercontent.com/vakhov/fresh-proxy-list/refs/heads/master/http.txt", Some("http"))
                .list("https://raw.githubusercontent.com/vakhov/fresh-proxy-list/refs/heads/master/socks5.txt", Some("socks5")),
        ),
        Arc::new(TextListSource::new("proxifly").list(
            "https://raw.githubusercontent.com/proxifly/free-proxy-list/refs/heads/main/proxies/all/data.txt",
            None,
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn prefixes_scheme_once() {
        assert_eq!(with_scheme(" 1.2.3.4:80 ", Some("http")), "http://1.2.3.4:80");
        assert_eq!(with_scheme("socks4://1.2.3.4:80", Some("http")), "socks4://1.2.3.4:80");
        assert_eq!(with_scheme("1.2.3.4:80", None), "1.2.3.4:80");
    }

    #[test]
    fn built_in_sources_are_named() {
        let names: Vec<String> = default_sources()
            .iter()
            .map(|source| source.name().to_string())
            .collect();
        assert_eq!(
            names,
            ["proxyscrape", "ercindedeoglu", "kangproxy", "vakhov", "proxifly"]
        );
    }

    #[tokio::test]
    async fn fetches_and_cleans_crlf_lists() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/http.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("1.2.3.4:8080\r\n0.0.0.0:80\r\nnot-a-proxy\r\n1.2.3.4:8080\r\n"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/socks5.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("5.6.7.8:1080\n"))
            .mount(&server)
            .await;

        let source = TextListSource::new("local")
            .list(format!("{}/http.txt", server.uri()), Some("http"))
            .list(format!("{}/socks5.txt", server.uri()), Some("socks5"));
        let proxies = source.fetch().await.unwrap();
        assert_eq!(proxies, vec!["http://1.2.3.4:8080", "socks5://5.6.7.8:1080"]);
    }

    #[tokio::test]
    async fn failing_list_fails_source() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = TextListSource::new("down").list(format!("{}/http.txt", server.uri()), Some("http"));
        assert!(matches!(
            source.fetch().await,
            Err(ProxyError::Status { status: 503, .. })
        ));
    }
}

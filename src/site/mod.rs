//! Consumer contract for per-shop engines.
//!
//! A site engine owns one item URL, builds a [`SafeFetch`] from its
//! [`SiteOptions`], and hands usable bodies to a [`Parser`]. Field
//! extraction itself lives with each shop, not here.

pub mod item;
pub mod parse;

use async_trait::async_trait;
use http::Method;
use thiserror::Error;

use crate::safefetch::{FetchError, RequestOptions, SafeFetch};

pub use item::{
    DeliveryData, DeliveryPayType, DeliveryType, InventoryStatus, ItemData, ItemOptionData,
    ItemUnitData, ItemUnitType,
};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("missing field '{0}'")]
    MissingField(String),
    #[error("malformed document: {0}")]
    Malformed(String),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("invalid item url '{0}'")]
    InvalidItemUrl(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Turns a response body into an item record.
pub trait Parser: Send + Sync {
    fn parse(&self, text: &str) -> Result<ItemData, ParseError>;
}

impl<F> Parser for F
where
    F: Fn(&str) -> Result<ItemData, ParseError> + Send + Sync,
{
    fn parse(&self, text: &str) -> Result<ItemData, ParseError> {
        self(text)
    }
}

/// What a site engine is configured with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteOptions {
    pub item_url: String,
    pub proxies: Vec<String>,
    pub browser_endpoint: Option<String>,
    pub browser_proxies: Vec<String>,
}

impl SiteOptions {
    pub fn new(item_url: impl Into<String>) -> Self {
        Self {
            item_url: item_url.into(),
            ..Default::default()
        }
    }

    /// A fetcher carrying these proxies and browser settings.
    pub fn fetcher(&self) -> SafeFetch {
        let mut fetch = SafeFetch::new();
        fetch
            .proxies(self.proxies.iter().cloned())
            .browser_endpoint(self.browser_endpoint.as_deref(), self.browser_proxies.clone());
        fetch
    }
}

/// One tracked item on one shop.
#[async_trait]
pub trait SiteEngine: Send + Sync {
    /// `Ok(None)` means the shop is temporarily unavailable.
    async fn load(&self) -> Result<Option<ItemData>, SiteError>;

    fn id(&self) -> String;

    /// Canonical, human-facing item link.
    fn url(&self) -> String;

    fn engine_code(&self) -> &'static str;

    fn engine_name(&self) -> &'static str;
}

/// Fetch `url` and parse it only when the response is usable.
pub async fn fetch_and_parse<P: Parser + ?Sized>(
    fetch: &mut SafeFetch,
    method: Method,
    url: &str,
    options: RequestOptions,
    parser: &P,
) -> Result<Option<ItemData>, SiteError> {
    let response = fetch.request(method, url, options).await?;
    if !response.has() {
        log::debug!(
            "{url} unavailable (status {:?}), skipping parse",
            response.status_code
        );
        return Ok(None);
    }
    let text = response.text().unwrap_or_default();
    Ok(Some(parser.parse(text)?))
}

//! # safefetch
//!
//! The fetch layer of a price tracker that polls bot-defended shops.
//!
//! A [`SafeFetch`] keeps one browser-like session (headers, cookie jar,
//! proxy candidates) and tries an ordered chain of transport engines until
//! one of them answers. Low-level failures stay inside the chain; callers see
//! either a response or, when asked to, the first error that occurred.
//!
//! ## Features
//!
//! - Engine fallback: TLS-profiled client, plain async client, blocking
//!   client on a bounded worker pool, headless Chrome
//! - One attempt budget shared by the whole chain
//! - Cookie continuity across attempts and calls
//! - Random proxy rotation plus a cached aggregate of public proxy lists
//! - "Not found" (404) reported as a response, not a failure
//! - One-shot re-authentication on 401/403
//!
//! ## Example
//!
//! ```no_run
//! use safefetch::{DeviceClass, RequestOptions, SafeFetch};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut fetch = SafeFetch::new();
//!     fetch
//!         .user_agent_random(DeviceClass::Mobile)
//!         .accept_language_random()
//!         .cookie("PCID", "0");
//!
//!     let response = fetch
//!         .request(
//!             http::Method::GET,
//!             "https://example.com/item/1",
//!             RequestOptions::new().max_tries(5),
//!         )
//!         .await?;
//!     if response.has() {
//!         println!("{}", response.text().unwrap_or_default());
//!     }
//!     Ok(())
//! }
//! ```

mod safefetch;

pub mod config;
pub mod modules;
pub mod response;
pub mod site;
pub mod transport;

pub use crate::safefetch::{
    DEFAULT_MAX_TRIES,
    FetchError,
    FetchResult,
    PostTryHook,
    RequestOptions,
    SafeFetch,
    SafeFetchConfig,
};

pub use crate::config::{ConfigError, FetchSettings};

pub use crate::response::FetchResponse;

pub use crate::transport::{
    AsyncEngine,
    BlockingEngine,
    EngineChain,
    EngineKind,
    FetchRequest,
    ImpersonateEngine,
    RequestBody,
    TransportEngine,
    TransportError,
    WorkerPool,
    check_status,
    default_chain,
};

#[cfg(feature = "browser")]
pub use crate::transport::BrowserEngine;

pub use crate::modules::{
    DeviceClass,
    EventDispatcher,
    EventHandler,
    FetchEvent,
    IdentityBuilder,
    LoggingHandler,
    ProxyCache,
    ProxyPool,
    ProxySource,
};

pub use crate::site::{ItemData, Parser, SiteEngine, SiteOptions};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

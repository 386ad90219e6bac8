//! Cross-cutting services module
//!
//! Identity headers, browser TLS profiles, proxy sourcing and fetch events.

pub mod events;
pub mod identity;
pub mod proxy;
pub mod tls;

// Re-export commonly used types
pub use events::{
    AttemptEvent, EventDispatcher, EventHandler, ExhaustedEvent, FailureEvent, FetchEvent,
    LoggingHandler, SuccessEvent,
};
pub use identity::{CLIENT_HINT_HEADERS, DeviceClass, IdentityBuilder, IdentityError, bot_agents};
pub use proxy::{
    Clock, ManualClock, ProxyCache, ProxyError, ProxyPool, ProxySource, SystemClock,
    TextListSource, default_sources, sanitize_proxy_list,
};
pub use tls::{BrowserProfile, BrowserType, TlsConfig, TlsProfileManager};

//! Fetch lifecycle events.
//!
//! The orchestrator reports every attempt, its outcome and the final
//! exhaustion through an [`EventDispatcher`]. [`LoggingHandler`] turns them
//! into `log` records; callers may register their own handlers.

use chrono::{DateTime, Utc};
use http::Method;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::transport::{EngineKind, TransportError};

/// An engine is about to be tried.
#[derive(Debug, Clone)]
pub struct AttemptEvent {
    pub url: Url,
    pub method: Method,
    pub engine: EngineKind,
    pub engine_name: String,
    pub attempt: usize,
    pub proxy: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SuccessEvent {
    pub url: Url,
    pub engine: EngineKind,
    pub engine_name: String,
    pub status: Option<u16>,
    pub latency: Duration,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FailureEvent {
    pub url: Url,
    pub engine: EngineKind,
    pub engine_name: String,
    pub attempt: usize,
    pub error: TransportError,
    pub timestamp: DateTime<Utc>,
}

/// Every attempt failed or the budget ran out.
#[derive(Debug, Clone)]
pub struct ExhaustedEvent {
    pub url: Url,
    pub attempts: usize,
    pub errors: Vec<TransportError>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum FetchEvent {
    Attempt(AttemptEvent),
    Success(SuccessEvent),
    Failure(FailureEvent),
    Exhausted(ExhaustedEvent),
}

/// Trait implemented by event handlers.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &FetchEvent);
}

/// Broadcasts events to registered handlers.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    /// Dispatcher with the [`LoggingHandler`] already registered.
    pub fn with_logging() -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register_handler(Arc::new(LoggingHandler));
        dispatcher
    }

    pub fn register_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn dispatch(&self, event: FetchEvent) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }
}

/// Logs events using the `log` crate.
#[derive(Debug)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn handle(&self, event: &FetchEvent) {
        match event {
            FetchEvent::Attempt(attempt) => {
                log::debug!(
                    "-> {} {} via {} (attempt {}, proxy {})",
                    attempt.method,
                    attempt.url,
                    attempt.engine_name,
                    attempt.attempt,
                    attempt.proxy.as_deref().unwrap_or("none")
                );
            }
            FetchEvent::Success(success) => {
                log::debug!(
                    "<- {} via {} -> {:?} ({:.2}s)",
                    success.url,
                    success.engine_name,
                    success.status,
                    success.latency.as_secs_f64()
                );
            }
            FetchEvent::Failure(failure) => {
                log::warn!(
                    "{} failed on {} (attempt {}): {}",
                    failure.engine_name,
                    failure.url,
                    failure.attempt,
                    failure.error
                );
            }
            FetchEvent::Exhausted(exhausted) => {
                log::debug!(
                    "gave up on {} after {} attempts ({} errors)",
                    exhausted.url,
                    exhausted.attempts,
                    exhausted.errors.len()
                );
                for error in &exhausted.errors {
                    log::debug!("  {error}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingHandler(std::sync::Mutex<usize>);

    impl EventHandler for CountingHandler {
        fn handle(&self, _event: &FetchEvent) {
            *self.0.lock().unwrap() += 1;
        }
    }

    #[test]
    fn dispatches_to_handlers() {
        let mut dispatcher = EventDispatcher::with_logging();
        let counter = Arc::new(CountingHandler(std::sync::Mutex::new(0)));
        dispatcher.register_handler(counter.clone());
        assert_eq!(dispatcher.len(), 2);

        dispatcher.dispatch(FetchEvent::Failure(FailureEvent {
            url: Url::parse("https://shop.example").unwrap(),
            engine: EngineKind::Async,
            engine_name: "async".into(),
            attempt: 1,
            error: TransportError::Timeout(Duration::from_secs(1)),
            timestamp: Utc::now(),
        }));
        assert_eq!(*counter.0.lock().unwrap(), 1);
    }
}

#![deny(unused)]
//! Model gateway for the consultation engine.
//!
//! This crate provides:
//! - The fixed model catalog and keyword model selection
//! - A three-state circuit breaker with observable transitions
//! - Exponential-backoff retry for transient failures
//! - The HTTP upstream client and a mock for tests

pub mod catalog;
pub mod circuit_breaker;
pub mod http_client;
pub mod mock;
pub mod retry;
pub mod selector;

pub use catalog::{DEFAULT_MODEL_ID, MODELS};
pub use circuit_breaker::{BreakerStats, CircuitBreaker, LoggingListener};
pub use http_client::HttpUpstreamClient;
pub use mock::{MockUpstreamClient, RecordedCall};
pub use retry::RetryPolicy;
pub use selector::{KeywordModelSelector, TaskCategory};

use std::sync::Arc;

use consult_core::{config::AppConfig, traits::BreakerListener};

/// Create the guarded upstream client from configuration.
///
/// The breaker always logs transitions; `listeners` are attached after the
/// logging listener.
pub fn create_client_from_config(
    config: &AppConfig,
    listeners: Vec<Arc<dyn BreakerListener>>,
) -> HttpUpstreamClient {
    let breaker = CircuitBreaker::new("upstream", config.circuit_breaker.clone())
        .with_listener(Arc::new(LoggingListener));
    for listener in listeners {
        breaker.add_listener(listener);
    }

    if config.upstream.api_key.is_none() {
        tracing::warn!("No upstream API key configured, requests will be sent unauthenticated");
    }

    HttpUpstreamClient::new(
        &config.upstream,
        Arc::new(breaker),
        RetryPolicy::from_config(&config.retry),
    )
}

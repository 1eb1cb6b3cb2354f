use std::time::Duration;

use config::{Config, Environment, File};
use secrecy::Secret;
use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
    pub history: HistoryConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub retry: RetryConfig,
    pub upstream: UpstreamConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            sweep_interval_secs: 60,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_messages: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_messages: 20 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Hard limit for a single guarded call.
    pub call_timeout_ms: u64,
    /// Failure fraction above which the breaker opens.
    pub error_threshold: f64,
    /// Time spent OPEN before a probe is allowed.
    pub reset_timeout_ms: u64,
    /// Width of the rolling statistics window.
    pub rolling_window_ms: u64,
    /// Minimum calls in the window before the breaker may open.
    pub volume_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: 30_000,
            error_threshold: 0.5,
            reset_timeout_ms: 30_000,
            rolling_window_ms: 10_000,
            volume_threshold: 0,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    pub fn rolling_window(&self) -> Duration {
        Duration::from_millis(self.rolling_window_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 10_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UpstreamConfig {
    pub endpoint: String,
    pub api_key: Option<Secret<String>>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://openrouter.ai/api/v1/chat/completions".into(),
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
}

impl AppConfig {
    /// Load configuration from optional files and `CONSULT__*` environment
    /// variables, then validate it.
    pub fn load() -> Result<Self> {
        let env = std::env::var("CONSULT_ENV").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Map CONSULT__RATE_LIMIT__REQUESTS_PER_MINUTE=40 to rate_limit.requests_per_minute
            .add_source(
                Environment::with_prefix("CONSULT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the components cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.rate_limit.requests_per_minute == 0 {
            return Err(Error::config("rate_limit.requests_per_minute must be positive"));
        }
        if self.cache.sweep_interval_secs == 0 {
            return Err(Error::config("cache.sweep_interval_secs must be positive"));
        }
        if self.history.max_messages == 0 {
            return Err(Error::config("history.max_messages must be positive"));
        }
        let threshold = self.circuit_breaker.error_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(Error::config(format!(
                "circuit_breaker.error_threshold must be in (0, 1], got {}",
                threshold
            )));
        }
        if self.circuit_breaker.call_timeout_ms == 0 {
            return Err(Error::config("circuit_breaker.call_timeout_ms must be positive"));
        }
        if self.circuit_breaker.reset_timeout_ms == 0 {
            return Err(Error::config("circuit_breaker.reset_timeout_ms must be positive"));
        }
        if self.circuit_breaker.rolling_window_ms == 0 {
            return Err(Error::config("circuit_breaker.rolling_window_ms must be positive"));
        }
        if self.retry.attempts == 0 {
            return Err(Error::config("retry.attempts must be at least 1"));
        }
        if self.upstream.endpoint.trim().is_empty() {
            return Err(Error::config("upstream.endpoint must not be empty"));
        }
        Ok(())
    }
}

//! Fixed-window rate limiter keyed by caller identifier.

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

use consult_core::{config::RateLimitConfig, Error, Result};

/// Width of every rate-limit window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Counter for one identifier.
#[derive(Debug, Clone, Copy)]
struct RateLimitWindow {
    count: u32,
    reset_at: Instant,
}

/// Per-identifier fixed-window request counter.
///
/// The check-and-increment for one identifier runs under that key's shard
/// lock, so concurrent checks never observe a stale count. Windows are never
/// evicted.
pub struct RateLimiter {
    windows: DashMap<String, RateLimitWindow>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    /// Create a limiter allowing `max_requests` per 60-second window.
    pub fn new(max_requests: u32) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window: WINDOW,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.requests_per_minute)
    }

    /// Admit one request for `identifier` or fail with `RateLimited`.
    pub fn check(&self, identifier: &str) -> Result<()> {
        let now = Instant::now();
        let mut entry = self
            .windows
            .entry(identifier.to_string())
            .or_insert(RateLimitWindow {
                count: 0,
                reset_at: now,
            });

        if now >= entry.reset_at {
            *entry = RateLimitWindow {
                count: 1,
                reset_at: now + self.window,
            };
            return Ok(());
        }

        if entry.count >= self.max_requests {
            let remaining_ms = entry.reset_at.duration_since(now).as_millis() as u64;
            let retry_after_secs = remaining_ms.div_ceil(1000).max(1);
            tracing::debug!(
                identifier = identifier,
                count = entry.count,
                retry_after_secs,
                "Rate limit exceeded"
            );
            return Err(Error::RateLimited { retry_after_secs });
        }

        entry.count += 1;
        Ok(())
    }

    /// Requests still allowed in the current window.
    pub fn remaining(&self, identifier: &str) -> u32 {
        match self.windows.get(identifier) {
            Some(window) if Instant::now() < window.reset_at => {
                self.max_requests.saturating_sub(window.count)
            }
            _ => self.max_requests,
        }
    }

    /// Forget the window for one identifier.
    pub fn reset(&self, identifier: &str) {
        self.windows.remove(identifier);
    }

    /// Forget every window.
    pub fn reset_all(&self) {
        self.windows.clear();
    }
}

//! TTL cache for stateless consultation results.

use dashmap::DashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use consult_core::{config::CacheConfig, types::ConsultationResult};

/// Number of prompt characters that participate in the cache key.
pub const PROMPT_PREFIX_CHARS: usize = 100;

/// Cache entry with expiration.
#[derive(Debug, Clone)]
struct CacheEntry {
    /// Cached result, shared without copying.
    value: Arc<ConsultationResult>,
    /// Instant at which the entry stops being served.
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-memory response cache with a process-wide TTL.
///
/// Entries are replaced, never mutated. Expired entries are dropped lazily
/// on read and by the background sweeper.
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl ResponseCache {
    /// Create a cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl())
    }

    /// Cache key for a model and prompt.
    ///
    /// Only the first [`PROMPT_PREFIX_CHARS`] characters of the prompt are
    /// used, so prompts sharing that prefix share an entry.
    pub fn generate_cache_key(provider_model_id: &str, prompt: &str) -> String {
        let prefix: String = prompt.chars().take(PROMPT_PREFIX_CHARS).collect();
        format!("{}:{}", provider_model_id, prefix)
    }

    /// Fetch a live entry.
    pub fn get(&self, key: &str) -> Option<Arc<ConsultationResult>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
        } else {
            return None;
        }

        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Arc<ConsultationResult>>) {
        let key = key.into();
        tracing::debug!(key_len = key.len(), ttl_secs = self.ttl.as_secs(), "Caching response");
        self.entries.insert(
            key,
            CacheEntry {
                value: value.into(),
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Whether a live entry exists.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove an entry. Returns whether one was present.
    pub fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, expired ones not yet swept included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Spawn a task purging expired entries every `period`.
    ///
    /// The task exits once the cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(live) = cache.upgrade() else {
                    break;
                };
                let purged = live.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, remaining = live.len(), "Swept expired cache entries");
                }
            }
        })
    }
}

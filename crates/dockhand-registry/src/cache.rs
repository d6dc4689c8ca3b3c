//! In-memory response cache with per-entry expiry.
//!
//! Entries are evicted lazily on read and periodically by a background
//! sweeper. Time comes from a [`Clock`] so expiry can be tested without
//! sleeping.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tokio::task::JoinHandle;

use crate::broker::BearerToken;

/// Source of the current time for expiry checks.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for tests.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    offset: Mutex<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Creates a clock frozen at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.offset.lock()
    }
}

/// Configuration for the expiring cache.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// TTL used by [`ExpiringCache::set_default`] (default: 5 minutes).
    pub default_ttl: Duration,

    /// Interval between background sweeps (default: 5 minutes).
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(5 * 60),
        }
    }
}

impl CacheConfig {
    /// Sets the default TTL.
    #[must_use]
    pub const fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Sets the sweep interval.
    #[must_use]
    pub const fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Key-value store where every entry carries its own expiry.
///
/// Reads, writes and evictions for a key happen under one lock, so the
/// cache can be shared across tasks on a multi-threaded runtime.
pub struct ExpiringCache<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
}

impl<K, V> fmt::Debug for ExpiringCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringCache")
            .field("entries", &self.entries.lock().len())
            .field("clock", &self.clock)
            .field("config", &self.config)
            .finish()
    }
}

impl<K, V> Default for ExpiringCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Creates an empty cache using the system clock.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates an empty cache reading time from `clock`.
    #[must_use]
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            config,
        }
    }

    /// Returns the cache configuration.
    #[must_use]
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Stores `value` under `key` until `ttl` has elapsed, replacing any previous entry.
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        let expires_at = self.clock.now() + ttl;
        self.entries
            .lock()
            .insert(key, CacheEntry { value, expires_at });
    }

    /// Stores `value` under `key` with the configured default TTL.
    pub fn set_default(&self, key: K, value: V) {
        self.set(key, value, self.config.default_ttl);
    }

    /// Returns the live value for `key`.
    ///
    /// An expired entry is removed and reported as absent.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let expired = now > entries.get(key)?.expires_at;
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| now <= entry.expires_at);
        before - entries.len()
    }

    /// Returns the number of stored entries, including expired ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Spawns a task that sweeps expired entries every `sweep_interval`.
    ///
    /// The task holds a weak reference and exits once the cache is dropped.
    /// Must be called from within a tokio runtime.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        let period = self.config.sweep_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let removed = cache.sweep();
                if removed > 0 {
                    tracing::debug!(removed, "Swept expired cache entries");
                }
            }
        })
    }
}

/// Who a cached response or token was fetched for.
///
/// Holds a username and a SHA-256 fingerprint of the secret or bearer token,
/// never the secret itself. Anonymous requests use [`Identity::anonymous`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Identity {
    /// Username used for basic auth, if any.
    pub username: Option<String>,
    /// Fingerprint of the secret or bearer token, if any.
    pub secret_fingerprint: Option<String>,
}

impl Identity {
    /// No credentials.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            username: None,
            secret_fingerprint: None,
        }
    }

    /// A bearer token, or anonymous when absent or blank.
    #[must_use]
    pub fn bearer(token: Option<&str>) -> Self {
        match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => Self {
                username: None,
                secret_fingerprint: Some(fingerprint(token)),
            },
            None => Self::anonymous(),
        }
    }

    /// A username and secret pair.
    #[must_use]
    pub fn basic(username: &str, secret: &str) -> Self {
        Self {
            username: Some(username.to_string()),
            secret_fingerprint: Some(fingerprint(secret)),
        }
    }

    /// Returns true if no credentials were involved.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        self.username.is_none() && self.secret_fingerprint.is_none()
    }
}

/// SHA-256 of a secret, hex encoded.
pub(crate) fn fingerprint(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// Structured cache key, one variant per cached operation.
///
/// Parameters are stored as separate fields, so separator characters inside
/// a value cannot make two different requests collide. Every variant carries
/// the caller's [`Identity`], so a response fetched with credentials is only
/// served back to the same credentials.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Repository search.
    Search {
        /// Search query.
        query: String,
        /// Page size.
        limit: u32,
        /// Page number.
        page: u32,
        /// Caller.
        identity: Identity,
    },

    /// Repository details.
    Repository {
        /// Repository path.
        path: String,
        /// Caller.
        identity: Identity,
    },

    /// Tag listing.
    Tags {
        /// Repository path.
        path: String,
        /// Page number.
        page: u32,
        /// Page size.
        limit: u32,
        /// Caller.
        identity: Identity,
    },

    /// Single tag details.
    TagDetails {
        /// Repository path.
        path: String,
        /// Tag name.
        tag: String,
        /// Caller.
        identity: Identity,
    },

    /// Manifest entries resolved from a tag.
    ManifestList {
        /// Repository path.
        path: String,
        /// Tag name.
        tag: String,
        /// Caller.
        identity: Identity,
    },

    /// Manifest entries resolved from a digest.
    ManifestDigest {
        /// Repository path.
        path: String,
        /// Content digest.
        digest: String,
        /// Caller.
        identity: Identity,
    },

    /// Repositories owned by a user.
    Repositories {
        /// Namespace owner.
        username: String,
        /// Caller.
        identity: Identity,
    },

    /// Registry pull-scope token.
    RegistryToken {
        /// Requested scope.
        scope: String,
        /// Caller.
        identity: Identity,
    },
}

/// Value stored in the shared response cache.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    /// A shaped API response.
    Resource(serde_json::Value),
    /// A bearer token.
    Token(BearerToken),
}

/// Cache shared by the token broker and the registry client.
pub type ResponseCache = ExpiringCache<CacheKey, CachedValue>;

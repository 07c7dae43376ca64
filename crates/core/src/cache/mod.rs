//! In-memory response cache keyed by target URL.
//!
//! Entries expire lazily: a lookup older than the TTL behaves exactly like a
//! miss, and nothing sweeps the map in the background. Growth is unbounded
//! unless a maximum entry count is configured, in which case inserting a new
//! key into a full cache evicts the oldest entry.
//!
//! Uses a HashMap behind a tokio RwLock. Entries are shared as
//! `Arc<CacheEntry>` and swapped whole, so a reader always sees a body and
//! content type written by the same `put`.

mod entry;

pub use entry::{CacheEntry, Payload};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::AppConfig;

/// Process-wide cache of fetched and transformed responses.
pub struct ResponseCache {
    entries: RwLock<HashMap<String, Arc<CacheEntry>>>,
    ttl: Duration,
    max_entries: Option<usize>,
}

impl ResponseCache {
    /// Create an unbounded cache with the given time-to-live.
    pub fn new(ttl: Duration) -> Self {
        Self { entries: RwLock::new(HashMap::new()), ttl, max_entries: None }
    }

    /// Create a cache holding at most `max_entries` entries.
    pub fn bounded(ttl: Duration, max_entries: usize) -> Self {
        Self { entries: RwLock::new(HashMap::new()), ttl, max_entries: Some(max_entries) }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        match config.cache_max_entries {
            Some(max) => Self::bounded(config.cache_ttl(), max),
            None => Self::new(config.cache_ttl()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a fresh entry for `key`.
    pub async fn get(&self, key: &str) -> Option<Arc<CacheEntry>> {
        self.get_at(key, Instant::now()).await
    }

    /// Look up a fresh entry for `key` as of `now`.
    pub async fn get_at(&self, key: &str, now: Instant) -> Option<Arc<CacheEntry>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.is_fresh_at(now, self.ttl) => {
                tracing::debug!("cache hit for {}", key);
                Some(Arc::clone(entry))
            }
            Some(_) => {
                tracing::debug!("cache entry for {} expired", key);
                None
            }
            None => None,
        }
    }

    /// Install or replace the entry for `key`.
    pub async fn put(&self, key: &str, content_type: &str, body: Payload) -> Arc<CacheEntry> {
        self.put_at(key, content_type, body, Instant::now()).await
    }

    /// Install or replace the entry for `key`, stamped with `now`.
    pub async fn put_at(&self, key: &str, content_type: &str, body: Payload, now: Instant) -> Arc<CacheEntry> {
        let entry = Arc::new(CacheEntry::new(key, content_type, body, now));
        let mut entries = self.entries.write().await;

        if let Some(max) = self.max_entries
            && !entries.contains_key(key)
            && entries.len() >= max
        {
            entries.retain(|_, e| e.is_fresh_at(now, self.ttl));
            if entries.len() >= max {
                evict_oldest(&mut entries);
            }
        }

        entries.insert(key.to_string(), Arc::clone(&entry));
        entry
    }

    /// Drop every expired entry, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now()).await
    }

    pub async fn purge_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.is_fresh_at(now, self.ttl));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn evict_oldest(entries: &mut HashMap<String, Arc<CacheEntry>>) {
    let oldest = entries
        .iter()
        .min_by_key(|(_, e)| e.stored_at)
        .map(|(k, _)| k.clone());

    if let Some(key) = oldest {
        tracing::debug!("evicting {} from full cache", key);
        entries.remove(&key);
    }
}

//! Cached payloads.

use bytes::Bytes;
use std::time::{Duration, Instant};

/// Body of a cached or freshly proxied response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Rewritten HTML.
    Text(String),
    /// Any other content, byte-for-byte as fetched.
    Binary(Bytes),
}

impl Payload {
    /// Length of the payload in bytes.
    pub fn len(&self) -> usize {
        match self {
            Payload::Text(s) => s.len(),
            Payload::Binary(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Payload as raw bytes, suitable for a response body.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Payload::Text(s) => Bytes::from(s.clone()),
            Payload::Binary(b) => b.clone(),
        }
    }
}

/// A cached response for one target URL.
///
/// Never mutated after construction; the cache hands out `Arc<CacheEntry>`
/// and replaces entries whole.
#[derive(Debug)]
pub struct CacheEntry {
    /// Original, un-rewritten target URL.
    pub key: String,
    pub stored_at: Instant,
    pub body: Payload,
    /// MIME type echoed back on hits.
    pub content_type: String,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, content_type: impl Into<String>, body: Payload, stored_at: Instant) -> Self {
        Self { key: key.into(), stored_at, body, content_type: content_type.into() }
    }

    /// Whether the entry is still fresh at `now`.
    ///
    /// Fresh means strictly less than `ttl` has elapsed since `stored_at`.
    pub fn is_fresh_at(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) < ttl
    }
}

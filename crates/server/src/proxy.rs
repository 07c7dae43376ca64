//! Proxy request orchestration.
//!
//! Looks the target up in the response cache, fetches it on a miss, rewrites
//! HTML pages, stores the result and hands it back.
//!
//! The cache is keyed by the target URL alone. A POST for a URL that is still
//! cached is answered from the cache without reaching the upstream, and a
//! POST response is served to later GETs of the same URL until it expires.

use std::sync::Arc;

use pagewarp_client::{Fetcher, HTML_CONTENT_TYPE, Method, UpstreamRequest, is_html, parse_target, transform};
use pagewarp_core::{CacheEntry, Error, Payload, ResponseCache};

use crate::error::ProxyError;

/// Content type used when the upstream sends none.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// One inbound proxy request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Target URL exactly as the client sent it.
    pub target_url: Option<String>,
    pub method: Method,
    /// Inbound User-Agent header.
    pub user_agent: Option<String>,
    /// Query (GET) or form (POST) pairs to forward, without the `url` pair.
    pub params: Vec<(String, String)>,
}

impl RequestContext {
    pub fn get(target_url: impl Into<String>) -> Self {
        Self { target_url: Some(target_url.into()), method: Method::GET, user_agent: None, params: Vec::new() }
    }
}

/// Whether a response came from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// Content to send back to the client.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub body: Payload,
    pub content_type: String,
    /// `None` for error pages, which never touch the cache.
    pub cache_status: Option<CacheStatus>,
}

impl ProxyResponse {
    fn from_entry(entry: &CacheEntry, status: CacheStatus) -> Self {
        Self { body: entry.body.clone(), content_type: entry.content_type.clone(), cache_status: Some(status) }
    }

    fn error_page(err: &ProxyError) -> Self {
        Self { body: Payload::Text(err.to_page()), content_type: HTML_CONTENT_TYPE.to_string(), cache_status: None }
    }
}

/// The rewrite-and-cache engine behind the `/proxy` endpoint.
pub struct Proxy {
    cache: Arc<ResponseCache>,
    fetcher: Arc<dyn Fetcher>,
}

impl Proxy {
    pub fn new(cache: Arc<ResponseCache>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { cache, fetcher }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Serve one proxy request.
    ///
    /// # Errors
    ///
    /// Returns `ProxyError::MissingUrl` when no target was given, and
    /// `ProxyError::Upstream` when the target is not a web URL or the fetch
    /// failed. Failures are never cached.
    pub async fn handle(&self, ctx: RequestContext) -> Result<ProxyResponse, ProxyError> {
        let key = match ctx.target_url.as_deref() {
            Some(target) if !target.trim().is_empty() => target.to_string(),
            _ => return Err(ProxyError::MissingUrl),
        };

        if let Some(entry) = self.cache.get(&key).await {
            return Ok(ProxyResponse::from_entry(&entry, CacheStatus::Hit));
        }

        let url = parse_target(&key).map_err(Error::from)?;
        let request = UpstreamRequest { url, method: ctx.method, user_agent: ctx.user_agent, params: ctx.params };
        let response = self.fetcher.fetch(&request).await?;

        let upstream_type = response.content_type.as_deref().unwrap_or_default();
        let (body, content_type) = if is_html(upstream_type) {
            let html = response.text();
            (Payload::Text(transform(&html, &response.final_url)), HTML_CONTENT_TYPE)
        } else if upstream_type.is_empty() {
            (Payload::Binary(response.bytes.clone()), FALLBACK_CONTENT_TYPE)
        } else {
            (Payload::Binary(response.bytes.clone()), upstream_type)
        };

        let entry = self.cache.put(&key, content_type, body).await;
        tracing::debug!("cached {} ({}, {} bytes)", key, entry.content_type, entry.body.len());

        Ok(ProxyResponse::from_entry(&entry, CacheStatus::Miss))
    }

    /// Serve one proxy request, rendering any failure as an error page.
    pub async fn respond(&self, ctx: RequestContext) -> ProxyResponse {
        let target = ctx.target_url.clone();
        match self.handle(ctx).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(target_url = target.as_deref().unwrap_or(""), error = %err, "proxy request failed");
                ProxyResponse::error_page(&err)
            }
        }
    }
}

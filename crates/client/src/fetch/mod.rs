//! Upstream HTTP fetch.
//!
//! ### Request Shaping
//! - GET: forwarded parameters are appended to the target's own query string
//! - POST: forwarded parameters are sent as an `application/x-www-form-urlencoded` body
//! - User-Agent: the inbound client's when present, otherwise the configured default
//!
//! ### Limits
//! - Request timeout: 30s (configurable)
//! - Max redirects: 10 (configurable)
//! - Max body bytes: 25MB (configurable)
//!
//! Upstream error statuses are not failures: a 404 page is proxied like any
//! other page. Only transport failures surface as errors, and none are retried.

pub mod charset;
pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Url, header};
use std::time::{Duration, Instant};

pub use reqwest::{Method, StatusCode};
pub use self::url::{UrlError, parse_target};

use pagewarp_core::{AppConfig, Error};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Fallback User-Agent (default: "Mozilla/5.0")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 25MB)
    pub max_bytes: usize,

    /// Request timeout (default: 30s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 10)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0".to_string(),
            max_bytes: 25 * 1024 * 1024,
            timeout: Duration::from_millis(30_000),
            max_redirects: 10,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
        }
    }
}

/// One outbound request on behalf of a proxied client.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub url: Url,
    pub method: Method,
    /// Inbound User-Agent, if the client sent one.
    pub user_agent: Option<String>,
    /// Query (GET) or form (POST) pairs, in inbound order.
    pub params: Vec<(String, String)>,
}

impl UpstreamRequest {
    pub fn get(url: Url) -> Self {
        Self { url, method: Method::GET, user_agent: None, params: Vec::new() }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The original URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Body decoded as text in its declared charset.
    pub fn text(&self) -> String {
        charset::decode(&self.bytes, self.content_type.as_deref())
    }
}

/// Source of upstream responses.
///
/// The proxy depends on this trait rather than on [`FetchClient`] so tests can
/// substitute a stub.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the target described by `request`.
    async fn fetch(&self, request: &UpstreamRequest) -> Result<FetchResponse, Error>;
}

/// reqwest-backed [`Fetcher`].
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Fetch(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn user_agent_for<'a>(&'a self, request: &'a UpstreamRequest) -> &'a str {
        request
            .user_agent
            .as_deref()
            .filter(|ua| !ua.trim().is_empty())
            .unwrap_or(&self.config.user_agent)
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, request: &UpstreamRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let url = request.url.clone();

        let mut builder = if request.method == Method::POST {
            self.http.post(url.clone()).form(&request.params)
        } else {
            let mut builder = self.http.get(url.clone());
            if !request.params.is_empty() {
                builder = builder.query(&request.params);
            }
            builder
        };
        builder = builder.header(header::USER_AGENT, self.user_agent_for(request));

        let response = builder.send().await.map_err(|e| transport_error(&url, &e))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && usize::try_from(len).map_or(true, |n| n > self.config.max_bytes)
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response.bytes().await.map_err(|e| transport_error(&url, &e))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "{} {} -> {} {} in {}ms ({} bytes)",
            request.method,
            url,
            final_url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { url, final_url, status, content_type, bytes, fetch_ms })
    }
}

fn transport_error(url: &Url, err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(format!("{}: {}", url, err))
    } else {
        Error::Fetch(format!("{}: {}", url, err))
    }
}

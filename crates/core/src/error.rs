//! Unified error types for pagewarp.
//!
//! Every variant renders as a human-readable message. Callers never branch on
//! the kind of failure; the proxy turns all of them into an error page.

/// Unified error types for the proxy engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Target URL could not be parsed or uses an unsupported scheme.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Network-level failure talking to the upstream (DNS, refused, TLS, body read).
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Upstream did not answer within the configured timeout.
    #[error("fetch timed out: {0}")]
    FetchTimeout(String),

    /// Upstream response body exceeds the configured limit.
    #[error("response too large: {0}")]
    FetchTooLarge(String),
}

//! Errors surfaced by the proxy endpoint.
//!
//! None of these reach the HTTP layer as failures: each one is rendered as an
//! error page in place of the requested content.

use pagewarp_core::Error;

/// Why a proxy request produced no content.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// No target URL in the query string or form.
    #[error("No URL")]
    MissingUrl,

    /// Target URL invalid or upstream fetch failed.
    #[error(transparent)]
    Upstream(#[from] Error),
}

impl ProxyError {
    /// Render the error as a page body.
    pub fn to_page(&self) -> String {
        match self {
            ProxyError::MissingUrl => format!("Error: {self}"),
            ProxyError::Upstream(_) => format!("<pre>Error: {}</pre>", escape_html(&self.to_string())),
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

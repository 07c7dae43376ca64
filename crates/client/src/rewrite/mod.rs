//! HTML rewriting so every follow-up request stays on the proxy.
//!
//! ### Attribute Rewriting
//! - A fixed table of `(tag, attribute)` rules names the URL-bearing attributes
//! - Each value is resolved against the page URL and replaced by its proxied form
//! - Non-web schemes (`javascript:`, `data:`, `mailto:`) are left as they are
//!
//! ### Interception Shim
//! - One inline script appended to `<body>` patches `fetch` and `XMLHttpRequest`
//!   so script-initiated requests are proxied too

pub mod html;
pub mod resolve;
pub mod shim;

pub use html::{HTML_CONTENT_TYPE, is_html, transform};
pub use resolve::{PROXY_PATH, from_proxied_form, resolve, to_proxied_form};
pub use shim::INTERCEPT_SHIM;

use scraper::Selector;

/// An HTML tag and the attribute on it that carries a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteRule {
    pub tag: &'static str,
    pub attribute: &'static str,
}

/// Every reference the transformer relocates.
pub const REWRITE_RULES: [RewriteRule; 5] = [
    RewriteRule { tag: "a", attribute: "href" },
    RewriteRule { tag: "img", attribute: "src" },
    RewriteRule { tag: "script", attribute: "src" },
    RewriteRule { tag: "link", attribute: "href" },
    RewriteRule { tag: "form", attribute: "action" },
];

impl RewriteRule {
    /// CSS selector matching elements this rule applies to.
    pub fn selector(&self) -> Selector {
        Selector::parse(&format!("{}[{}]", self.tag, self.attribute)).expect("invalid selector")
    }
}

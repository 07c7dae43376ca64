//! Client code for pagewarp.
//!
//! This crate provides the upstream fetch pipeline and the HTML rewrite
//! engine used by the proxy server.

pub mod fetch;
pub mod rewrite;

pub use fetch::{
    FetchClient, FetchConfig, FetchResponse, Fetcher, Method, StatusCode, UpstreamRequest, UrlError, parse_target,
};

pub use rewrite::{
    HTML_CONTENT_TYPE, INTERCEPT_SHIM, PROXY_PATH, REWRITE_RULES, RewriteRule, from_proxied_form, is_html, resolve,
    to_proxied_form, transform,
};

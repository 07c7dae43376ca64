//! URL resolution and the proxied reference form.
//!
//! A proxied reference has the shape `/proxy?url=<encoded absolute URL>`.
//! The whole absolute URL, including its own query string and fragment, is
//! form-urlencoded into the single `url` parameter, so decoding that
//! parameter gives back exactly the URL that was encoded.

use url::{Url, form_urlencoded};

use crate::fetch::UrlError;

/// Path of the proxy entry point.
pub const PROXY_PATH: &str = "/proxy";

/// Resolve a possibly relative `reference` against `base`.
///
/// Handles scheme-relative (`//host/p`), absolute-path, path-relative,
/// query-only (`?q=1`) and fragment-only (`#top`) references. Surrounding
/// whitespace, common in hand-written attributes, is ignored.
pub fn resolve(base: &Url, reference: &str) -> Result<Url, UrlError> {
    base.join(reference.trim())
        .map_err(|e| UrlError::InvalidUrl(format!("{reference}: {e}")))
}

/// Reference that routes a request for `absolute` back through the proxy.
pub fn to_proxied_form(absolute: &Url) -> String {
    let encoded: String = form_urlencoded::byte_serialize(absolute.as_str().as_bytes()).collect();
    format!("{PROXY_PATH}?url={encoded}")
}

/// Decode the target URL out of a proxied reference.
///
/// Returns `None` when `reference` is not a proxied reference.
pub fn from_proxied_form(reference: &str) -> Option<String> {
    let query = reference.strip_prefix(PROXY_PATH)?.strip_prefix('?')?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.into_owned())
}

//! Script injected into every proxied HTML page.
//!
//! Patches `window.fetch` and `XMLHttpRequest.prototype.open` so that any URL
//! a page script requests is resolved against the page's real address and sent
//! to `/proxy?url=<encodeURIComponent(absolute)>` instead. The real address is
//! read back from the `url` parameter of the frame's own location, falling
//! back to `location.href` for pages reached through a POST.
//!
//! POST bodies given to `fetch` are re-encoded as `URLSearchParams` (form
//! data). Other request options pass through untouched. JSON and multipart
//! bodies are forwarded best effort only.

/// Marker attribute on the injected `<script>` element.
pub const SHIM_MARKER: &str = "data-pagewarp-shim";

/// The interception shim, as a complete `<script>` element.
pub const INTERCEPT_SHIM: &str = r#"<script data-pagewarp-shim>
(function () {
  var PROXY = '/proxy?url=';
  var base = new URLSearchParams(location.search).get('url') || location.href;

  function proxied(url) {
    return PROXY + encodeURIComponent(new URL(String(url), base).href);
  }

  var originalFetch = window.fetch;
  window.fetch = function (input, options) {
    var target = (input && typeof input === 'object' && 'url' in input) ? input.url : input;
    var proxyUrl = proxied(target);
    var method = String((options && options.method) || 'GET').toUpperCase();
    if (options && options.body && method === 'POST') {
      var formData = new URLSearchParams();
      new URLSearchParams(options.body).forEach(function (v, k) { formData.append(k, v); });
      return originalFetch.call(window, proxyUrl, { method: 'POST', body: formData });
    }
    return originalFetch.call(window, proxyUrl, options);
  };

  var originalOpen = XMLHttpRequest.prototype.open;
  XMLHttpRequest.prototype.open = function (method, url) {
    var args = Array.prototype.slice.call(arguments);
    args[1] = proxied(url);
    return originalOpen.apply(this, args);
  };
})();
</script>"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shim_is_single_script_element() {
        assert!(INTERCEPT_SHIM.starts_with("<script data-pagewarp-shim>"));
        assert!(INTERCEPT_SHIM.ends_with("</script>"));
        assert_eq!(INTERCEPT_SHIM.matches("</script").count(), 1);
        assert!(INTERCEPT_SHIM.contains(SHIM_MARKER));
    }

    #[test]
    fn test_shim_patches_both_primitives() {
        assert!(INTERCEPT_SHIM.contains("window.fetch = function"));
        assert!(INTERCEPT_SHIM.contains("XMLHttpRequest.prototype.open = function"));
        assert!(INTERCEPT_SHIM.contains("'/proxy?url='"));
        assert!(INTERCEPT_SHIM.contains("encodeURIComponent"));
        assert!(INTERCEPT_SHIM.contains("new URLSearchParams()"));
    }
}

//! Target URL parsing.

/// Error type for target URL parsing failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for pagewarp_core::Error {
    fn from(err: UrlError) -> Self {
        pagewarp_core::Error::InvalidUrl(err.to_string())
    }
}

/// Parse a target URL as typed by a user or carried in a `url` parameter.
///
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Accept only http and https
///
/// Query string and fragment are kept as given.
pub fn parse_target(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if has_scheme(trimmed) { trimmed.to_string() } else { format!("https://{trimmed}") };

    let parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }
}

/// Whether `input` starts with `scheme://`.
fn has_scheme(input: &str) -> bool {
    let Some((scheme, _)) = input.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target_basic() {
        let url = parse_target("https://example.com").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_parse_target_default_scheme() {
        let url = parse_target("example.com/news").unwrap();
        assert_eq!(url.as_str(), "https://example.com/news");
    }

    #[test]
    fn test_parse_target_default_scheme_with_url_in_query() {
        let url = parse_target("example.com/r?to=http://x").unwrap();
        assert_eq!(url.as_str(), "https://example.com/r?to=http://x");
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_has_scheme() {
        assert!(has_scheme("https://ex.com"));
        assert!(has_scheme("svn+ssh://ex.com"));
        assert!(!has_scheme("ex.com/r?to=http://x"));
        assert!(!has_scheme("ex.com"));
        assert!(!has_scheme("://ex.com"));
        assert!(!has_scheme("1ab://ex.com"));
    }

    #[test]
    fn test_parse_target_http_allowed() {
        let url = parse_target("http://example.com").unwrap();
        assert_eq!(url.scheme(), "http");
    }

    #[test]
    fn test_parse_target_keeps_query_and_fragment() {
        let url = parse_target("https://example.com/search?q=a+b&page=2#results").unwrap();
        assert_eq!(url.query(), Some("q=a+b&page=2"));
        assert_eq!(url.fragment(), Some("results"));
    }

    #[test]
    fn test_parse_target_trim_whitespace() {
        let url = parse_target("  https://example.com  ").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_parse_target_unsupported_scheme() {
        let result = parse_target("file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_parse_target_empty() {
        assert!(matches!(parse_target(""), Err(UrlError::Empty)));
        assert!(matches!(parse_target("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_parse_target_invalid() {
        let result = parse_target("https://exa mple.com");
        assert!(matches!(result, Err(UrlError::InvalidUrl(_))));
    }

    #[test]
    fn test_url_error_into_core_error() {
        let err: pagewarp_core::Error = UrlError::Empty.into();
        assert!(matches!(err, pagewarp_core::Error::InvalidUrl(msg) if msg == "empty URL"));
    }
}

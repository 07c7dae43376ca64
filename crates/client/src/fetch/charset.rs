//! Response body decoding.
//!
//! The charset comes from the `Content-Type` header when it names one,
//! otherwise from a `charset=` declaration near the top of the document.
//! A byte order mark overrides both. Without any of these, bodies are UTF-8.

use encoding_rs::{Encoding, UTF_8};

/// How far into the body to look for a `<meta>` charset declaration.
const PRESCAN_BYTES: usize = 1024;

/// Decode `body` to text using the charset it declares.
pub fn decode(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_param)
        .or_else(|| prescan(body))
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);

    let (text, used, had_errors) = encoding.decode(body);
    if had_errors {
        tracing::debug!("malformed {} sequences replaced while decoding", used.name());
    }
    text.into_owned()
}

/// The `charset` parameter of a `Content-Type` value.
fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|part| {
        let (name, value) = part.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let label = value.trim().trim_matches(|c| c == '"' || c == '\'');
        (!label.is_empty()).then(|| label.to_string())
    })
}

/// A `charset=` label from the head of an HTML document.
fn prescan(body: &[u8]) -> Option<String> {
    let head = &body[..body.len().min(PRESCAN_BYTES)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();

    let start = head.find("charset=")? + "charset=".len();
    let label: String = head[start..]
        .trim_start_matches(|c| c == '"' || c == '\'')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
        .collect();

    (!label.is_empty()).then_some(label)
}

//! HTML transformation: attribute relocation and shim injection.

use scraper::{Html, Node, Selector, node::Element};
use url::Url;

use super::resolve::{resolve, to_proxied_form};
use super::shim::INTERCEPT_SHIM;
use super::{REWRITE_RULES, RewriteRule};

/// Content type of every transformed page.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Whether a response with this content type gets transformed.
pub fn is_html(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("text/html")
}

/// Rewrite an upstream HTML page so it keeps browsing through the proxy.
///
/// Parsing follows the HTML5 error-recovery rules, so malformed markup never
/// fails; it is rewritten as the browser would see it. If the recovered tree
/// somehow lacks a `<body>` to hold the shim, the input is returned unchanged.
pub fn transform(html: &str, base: &Url) -> String {
    let mut document = Html::parse_document(html);

    let rewritten: usize = REWRITE_RULES
        .iter()
        .map(|rule| rewrite_rule(&mut document, rule, base))
        .sum();

    if !inject_shim(&mut document) {
        tracing::warn!("no <body> in parsed page for {}; passing it through unmodified", base);
        return html.to_string();
    }

    tracing::debug!("rewrote {} references in {} ({} parse errors recovered)", rewritten, base, document.errors.len());

    document.html()
}

/// Apply one rule to every matching element, returning how many were rewritten.
fn rewrite_rule(document: &mut Html, rule: &RewriteRule, base: &Url) -> usize {
    let selector = rule.selector();

    let targets: Vec<_> = document
        .select(&selector)
        .filter_map(|element| {
            let value = element.value().attr(rule.attribute)?;
            let proxied = proxied_reference(base, value)?;
            Some((element.id(), proxied))
        })
        .collect();

    let mut count = 0;
    for (id, proxied) in targets {
        if let Some(mut node) = document.tree.get_mut(id)
            && let Node::Element(element) = node.value()
            && set_attribute(element, rule.attribute, proxied)
        {
            count += 1;
        }
    }
    count
}

/// Proxied form of `value`, or `None` when it should stay as written.
fn proxied_reference(base: &Url, value: &str) -> Option<String> {
    let absolute = resolve(base, value).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(to_proxied_form(&absolute)),
        _ => None,
    }
}

fn set_attribute(element: &mut Element, name: &str, value: String) -> bool {
    for (attr_name, attr_value) in element.attrs.iter_mut() {
        if &*attr_name.local == name {
            *attr_value = value.into();
            return true;
        }
    }
    false
}

/// Append the interception shim as the last child of `<body>`.
fn inject_shim(document: &mut Html) -> bool {
    let body_selector = Selector::parse("body").expect("invalid selector");
    let Some(body_id) = document.select(&body_selector).next().map(|body| body.id()) else {
        return false;
    };

    let fragment = Html::parse_fragment(INTERCEPT_SHIM);
    let script_selector = Selector::parse("script").expect("invalid selector");
    let Some(script) = fragment.select(&script_selector).next() else {
        return false;
    };

    let Some(mut body) = document.tree.get_mut(body_id) else {
        return false;
    };
    let mut injected = body.append(Node::Element(script.value().clone()));
    for child in script.children() {
        injected.append(child.value().clone());
    }
    true
}

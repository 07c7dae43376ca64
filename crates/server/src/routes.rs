//! HTTP routes.
//!
//! `/proxy` accepts GET and POST. The target comes from the `url` query
//! parameter, or for POST from a `url` form field when the query has none.
//! Every other query (GET) or form (POST) pair is forwarded upstream.
//! Proxy responses are always `200`; failures arrive as error pages.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use pagewarp_client::{Method, PROXY_PATH};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use url::form_urlencoded;

use crate::proxy::{FALLBACK_CONTENT_TYPE, Proxy, ProxyResponse, RequestContext};

const CACHE_STATUS_HEADER: &str = "x-cache-status";

/// Build the axum Router serving the shell page and the proxy endpoint.
pub fn router(proxy: Arc<Proxy>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route(PROXY_PATH, get(proxy_get).post(proxy_post))
        .layer(cors)
        .with_state(proxy)
}

/// Serve the embedded browser shell.
async fn index() -> impl IntoResponse {
    Html(include_str!("index.html"))
}

async fn health(State(proxy): State<Arc<Proxy>>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "cache_entries": proxy.cache().len().await,
    }))
}

async fn proxy_get(State(proxy): State<Arc<Proxy>>, headers: HeaderMap, RawQuery(query): RawQuery) -> Response {
    let (target_url, params) = split_target(parse_pairs(query.as_deref().unwrap_or("").as_bytes()));

    let ctx = RequestContext { target_url, method: Method::GET, user_agent: user_agent(&headers), params };
    into_response(proxy.respond(ctx).await)
}

async fn proxy_post(
    State(proxy): State<Arc<Proxy>>, headers: HeaderMap, RawQuery(query): RawQuery, body: Bytes,
) -> Response {
    let (query_target, _) = split_target(parse_pairs(query.as_deref().unwrap_or("").as_bytes()));
    let form = if is_form(&headers) { parse_pairs(&body) } else { Vec::new() };
    let (form_target, params) = split_target(form);

    let target_url = query_target.filter(|t| !t.is_empty()).or(form_target);
    let ctx = RequestContext { target_url, method: Method::POST, user_agent: user_agent(&headers), params };
    into_response(proxy.respond(ctx).await)
}

fn parse_pairs(input: &[u8]) -> Vec<(String, String)> {
    form_urlencoded::parse(input)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Separate the first `url` pair from the pairs to forward.
fn split_target(pairs: Vec<(String, String)>) -> (Option<String>, Vec<(String, String)>) {
    let mut target = None;
    let mut rest = Vec::with_capacity(pairs.len());
    for (key, value) in pairs {
        if key == "url" {
            if target.is_none() {
                target = Some(value);
            }
        } else {
            rest.push((key, value));
        }
    }
    (target, rest)
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("application/x-www-form-urlencoded"))
}

fn into_response(response: ProxyResponse) -> Response {
    let content_type = HeaderValue::from_str(&response.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(FALLBACK_CONTENT_TYPE));

    let mut res = Body::from(response.body.to_bytes()).into_response();
    res.headers_mut().insert(header::CONTENT_TYPE, content_type);
    if let Some(status) = response.cache_status {
        res.headers_mut()
            .insert(HeaderName::from_static(CACHE_STATUS_HEADER), HeaderValue::from_static(status.as_str()));
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use pagewarp_client::{FetchClient, FetchConfig};
    use pagewarp_core::ResponseCache;
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{body_string, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app() -> Router {
        let fetcher = FetchClient::new(FetchConfig::default()).unwrap();
        let proxy = Proxy::new(Arc::new(ResponseCache::new(Duration::from_secs(120))), Arc::new(fetcher));
        router(Arc::new(proxy))
    }

    fn encode(s: &str) -> String {
        form_urlencoded::byte_serialize(s.as_bytes()).collect()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn test_split_target() {
        let pairs = vec![
            ("a".to_string(), "1".to_string()),
            ("url".to_string(), "https://ex.com/".to_string()),
            ("url".to_string(), "https://other.com/".to_string()),
            ("b".to_string(), "2".to_string()),
        ];
        let (target, rest) = split_target(pairs);
        assert_eq!(target.as_deref(), Some("https://ex.com/"));
        assert_eq!(rest, vec![("a".to_string(), "1".to_string()), ("b".to_string(), "2".to_string())]);
    }

    #[test]
    fn test_parse_pairs_decodes() {
        let pairs = parse_pairs(b"url=https%3A%2F%2Fex.com%2F%3Fq%3D1&x=a+b");
        assert_eq!(pairs[0], ("url".to_string(), "https://ex.com/?q=1".to_string()));
        assert_eq!(pairs[1], ("x".to_string(), "a b".to_string()));
    }

    #[tokio::test]
    async fn test_index_serves_shell() {
        let (status, headers, body) = send(&app(), get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("Proxy Browser"));
        assert!(html.contains("/proxy?url="));
    }

    #[tokio::test]
    async fn test_health() {
        let (status, _, body) = send(&app(), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["cache_entries"], 0);
    }

    #[tokio::test]
    async fn test_proxy_without_url() {
        let (status, _, body) = send(&app(), get("/proxy")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_ref(), b"Error: No URL");
    }

    #[tokio::test]
    async fn test_proxy_get_rewrites_and_caches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dir/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"<html><body><a href="/p">p</a><img src="pic.png"></body></html>"#,
                "text/html; charset=utf-8",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let app = app();
        let target = format!("{}/dir/", server.uri());
        let uri = format!("/proxy?url={}", encode(&target));

        let (status, headers, body) = send(&app, get(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "text/html; charset=utf-8");
        assert_eq!(headers[CACHE_STATUS_HEADER], "MISS");
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains(&format!("href=\"/proxy?url={}\"", encode(&format!("{}/p", server.uri())))));
        assert!(html.contains(&format!("src=\"/proxy?url={}\"", encode(&format!("{}/dir/pic.png", server.uri())))));
        assert!(html.contains("data-pagewarp-shim"));

        let (_, headers, cached) = send(&app, get(&uri)).await;
        assert_eq!(headers[CACHE_STATUS_HEADER], "HIT");
        assert_eq!(cached, body);
    }

    #[tokio::test]
    async fn test_proxy_get_forwards_query_without_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("lang", "en"))
            .and(query_param("q", "rust"))
            .and(query_param_is_missing("url"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("{\"hits\":1}", "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let target = format!("{}/search?lang=en", server.uri());
        let uri = format!("/proxy?url={}&q=rust", encode(&target));
        let (_, headers, body) = send(&app(), get(&uri)).await;

        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(body.as_ref(), b"{\"hits\":1}");
    }

    #[tokio::test]
    async fn test_proxy_post_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(body_string("user=ann&pass=x+y"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("welcome", "text/plain"))
            .expect(1)
            .mount(&server)
            .await;

        let target = format!("{}/login", server.uri());
        let request = Request::builder()
            .method("POST")
            .uri("/proxy")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("url={}&user=ann&pass=x+y", encode(&target))))
            .unwrap();

        let (status, _, body) = send(&app(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_ref(), b"welcome");
    }

    #[tokio::test]
    async fn test_proxy_post_url_in_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api"))
            .and(body_string("k=v"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("saved", "text/plain"))
            .expect(1)
            .mount(&server)
            .await;

        let target = format!("{}/api", server.uri());
        let request = Request::builder()
            .method("POST")
            .uri(format!("/proxy?url={}", encode(&target)))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("k=v"))
            .unwrap();

        let (_, _, body) = send(&app(), request).await;
        assert_eq!(body.as_ref(), b"saved");
    }

    #[tokio::test]
    async fn test_proxy_binary_passthrough() {
        let png = vec![0x89, b'P', b'N', b'G', 0x00, 0xff, 0x10];
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pic.png"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(png.clone(), "image/png"))
            .mount(&server)
            .await;

        let uri = format!("/proxy?url={}", encode(&format!("{}/pic.png", server.uri())));
        let (_, headers, body) = send(&app(), get(&uri)).await;

        assert_eq!(headers[header::CONTENT_TYPE], "image/png");
        assert_eq!(body.to_vec(), png);
    }

    #[tokio::test]
    async fn test_proxy_user_agent_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(wiremock::matchers::header("user-agent", "TestBrowser/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("ok", "text/plain"))
            .expect(1)
            .mount(&server)
            .await;

        let request = Request::builder()
            .uri(format!("/proxy?url={}", encode(&format!("{}/", server.uri()))))
            .header(header::USER_AGENT, "TestBrowser/1.0")
            .body(Body::empty())
            .unwrap();
        let (_, _, body) = send(&app(), request).await;
        assert_eq!(body.as_ref(), b"ok");
    }

    #[tokio::test]
    async fn test_proxy_fetch_error_page() {
        let uri = format!("/proxy?url={}", encode("http://127.0.0.1:1/"));
        let (status, headers, body) = send(&app(), get(&uri)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(headers.get(CACHE_STATUS_HEADER).is_none());
        let page = String::from_utf8(body.to_vec()).unwrap();
        assert!(page.starts_with("<pre>Error: "));
        assert!(page.ends_with("</pre>"));
    }
}

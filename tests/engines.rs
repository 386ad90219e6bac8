use std::time::Duration;

use http::header::{HeaderMap, HeaderValue, USER_AGENT};
use http::Method;
use safefetch::{
    AsyncEngine, BlockingEngine, EngineChain, FetchRequest, ImpersonateEngine, RequestBody,
    RequestOptions, SafeFetch, TransportEngine, TransportError, WorkerPool,
};
use serde_json::json;
use std::sync::Arc;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn get(server: &MockServer, route: &str) -> FetchRequest {
    let url = Url::parse(&format!("{}{}", server.uri(), route)).unwrap();
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static("safefetch-tests"));
    FetchRequest::new(Method::GET, url)
        .with_headers(headers)
        .with_timeout(Duration::from_secs(5))
}

async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

fn engines() -> Vec<Box<dyn TransportEngine>> {
    vec![
        Box::new(AsyncEngine::new()),
        Box::new(AsyncEngine::shared()),
        Box::new(BlockingEngine::new(WorkerPool::new(2))),
        Box::new(ImpersonateEngine::new()),
    ]
}

#[tokio::test]
async fn every_engine_returns_body_and_cookies() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/item",
        ResponseTemplate::new(200)
            .insert_header("set-cookie", "sid=xyz; Path=/; HttpOnly")
            .set_body_string("<html>price</html>"),
    )
    .await;

    for engine in engines() {
        let response = engine.execute(&get(&server, "/item")).await.unwrap();
        assert_eq!(response.status_code, Some(200), "{}", engine.name());
        assert_eq!(response.text(), Some("<html>price</html>"), "{}", engine.name());
        assert_eq!(
            response.cookies.get("sid").map(String::as_str),
            Some("xyz"),
            "{}",
            engine.name()
        );
    }
}

#[tokio::test]
async fn every_engine_treats_not_found_as_response() {
    let server = MockServer::start().await;
    mount(&server, "/gone", ResponseTemplate::new(404)).await;

    for engine in engines() {
        let response = engine.execute(&get(&server, "/gone")).await.unwrap();
        assert!(response.is_not_found(), "{}", engine.name());
        assert!(!response.has(), "{}", engine.name());
    }
}

#[tokio::test]
async fn every_engine_fails_on_server_error() {
    let server = MockServer::start().await;
    mount(&server, "/boom", ResponseTemplate::new(500)).await;

    for engine in engines() {
        let err = engine.execute(&get(&server, "/boom")).await.unwrap_err();
        assert!(
            matches!(err, TransportError::Status { status: 500, .. }),
            "{}: {err}",
            engine.name()
        );
    }
}

#[tokio::test]
async fn unauthorized_maps_to_auth_error() {
    let server = MockServer::start().await;
    mount(&server, "/private", ResponseTemplate::new(401)).await;

    let err = AsyncEngine::new()
        .execute(&get(&server, "/private"))
        .await
        .unwrap_err();
    assert!(err.is_auth());
}

#[tokio::test]
async fn bearer_token_is_lifted_from_response() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/login",
        ResponseTemplate::new(200)
            .insert_header("authorization", "Bearer new-token")
            .set_body_string("{}"),
    )
    .await;

    let response = AsyncEngine::new()
        .execute(&get(&server, "/login"))
        .await
        .unwrap();
    assert_eq!(response.access_token.as_deref(), Some("new-token"));
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/slow",
        ResponseTemplate::new(200).set_delay(Duration::from_secs(3)),
    )
    .await;

    let request = get(&server, "/slow").with_timeout(Duration::from_millis(200));
    let err = AsyncEngine::new().execute(&request).await.unwrap_err();
    assert!(matches!(err, TransportError::Timeout(_)), "{err}");
}

#[tokio::test]
async fn json_body_is_sent_with_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/cart"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"itemId": 42})))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"added\":true}"))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/api/cart", server.uri())).unwrap();
    let request = FetchRequest::new(Method::POST, url)
        .with_body(Some(RequestBody::Json(json!({"itemId": 42}))));

    for engine in [
        Box::new(AsyncEngine::new()) as Box<dyn TransportEngine>,
        Box::new(BlockingEngine::new(WorkerPool::default())),
    ] {
        let response = engine.execute(&request).await.unwrap();
        assert_eq!(response.json().unwrap()["added"], true, "{}", engine.name());
    }
}

#[tokio::test]
async fn impersonation_detects_challenge_pages() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/guarded",
        ResponseTemplate::new(503)
            .insert_header("server", "cloudflare")
            .set_body_string("<html><div id=\"cf-chl-widget\"></div></html>"),
    )
    .await;

    let err = ImpersonateEngine::new()
        .execute(&get(&server, "/guarded"))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Challenge { .. }), "{err}");
}

#[tokio::test]
async fn session_cookie_carries_over_real_http() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/login",
        ResponseTemplate::new(200)
            .insert_header("set-cookie", "sid=abc; Path=/")
            .set_body_string("welcome"),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/item"))
        .and(header("cookie", "sid=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>item</html>"))
        .mount(&server)
        .await;

    let chain: EngineChain = vec![Arc::new(AsyncEngine::new())];
    let mut fetch = SafeFetch::new();
    fetch.jitter(Duration::ZERO).chain(chain);

    fetch.get(&format!("{}/login", server.uri())).await.unwrap();
    let response = fetch
        .request(
            Method::GET,
            &format!("{}/item", server.uri()),
            RequestOptions::new().raise_errors(true),
        )
        .await
        .unwrap();
    assert_eq!(response.text(), Some("<html>item</html>"));
}

#[tokio::test]
async fn chain_falls_through_to_next_real_engine() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/item"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount(&server, "/item", ResponseTemplate::new(200).set_body_string("ok")).await;

    let chain: EngineChain = vec![
        Arc::new(AsyncEngine::new()),
        Arc::new(BlockingEngine::new(WorkerPool::default())),
    ];
    let mut fetch = SafeFetch::new();
    fetch.jitter(Duration::ZERO).chain(chain);

    let response = fetch
        .request(
            Method::GET,
            &format!("{}/item", server.uri()),
            RequestOptions::new().raise_errors(true),
        )
        .await
        .unwrap();
    assert_eq!(response.text(), Some("ok"));
}

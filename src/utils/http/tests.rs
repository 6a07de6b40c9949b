use super::*;
use wiremock::matchers::{header_regex, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn get_response(server: &MockServer) -> Response {
    Client::new().get(server.uri()).send().await.unwrap()
}

#[tokio::test]
async fn test_api_client_sends_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header_regex("user-agent", "^bondvoyage/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = api_http_client(&ApiConfig::default());
    let resp = client.get(server.uri()).send().await.unwrap();
    assert!(resp.status().is_success());
}

#[tokio::test]
async fn test_error_body_under_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("booking not found"))
        .mount(&server)
        .await;
    let resp = get_response(&server).await;
    assert_eq!(read_error_body(resp, 1024).await, "booking not found");
}

#[tokio::test]
async fn test_error_body_over_limit_is_truncated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_bytes(vec![b'x'; 10_000]))
        .mount(&server)
        .await;
    let resp = get_response(&server).await;
    let text = read_error_body(resp, 100).await;
    assert!(text.starts_with(&"x".repeat(100)));
    assert!(text.ends_with("[truncated]"));
    assert!(!text.contains(&"x".repeat(101)));
}

#[tokio::test]
async fn test_error_body_invalid_utf8_is_lossy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_bytes(vec![0xFF, 0xFE, b'o', b'k']))
        .mount(&server)
        .await;
    let resp = get_response(&server).await;
    assert!(read_error_body(resp, 1024).await.contains("ok"));
}

#[tokio::test]
async fn test_error_body_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let resp = get_response(&server).await;
    assert!(read_error_body(resp, 1024).await.is_empty());
}

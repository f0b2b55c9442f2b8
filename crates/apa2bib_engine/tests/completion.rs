use std::time::Duration;

use apa2bib_engine::{
    ClientSettings, CompletionClient, CompletionRequest, FailureKind, ReqwestCompletionClient,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/v1beta/models/gemini-1.5-flash:generateContent";

fn request() -> CompletionRequest {
    CompletionRequest {
        model: "gemini-1.5-flash".to_string(),
        prompt: "Convert: Doe, J. (2021). Book.".to_string(),
        max_output_tokens: 1024,
        temperature: 0.1,
    }
}

fn client_for(server: &MockServer) -> ReqwestCompletionClient {
    ReqwestCompletionClient::new(ClientSettings {
        base_url: server.uri(),
        ..ClientSettings::default()
    })
    .expect("client builds")
}

#[tokio::test]
async fn client_sends_prompt_and_returns_candidate_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "secret-key"))
        .and(body_partial_json(json!({
            "contents": [{"parts": [{"text": "Convert: Doe, J. (2021). Book."}]}],
            "generationConfig": {"maxOutputTokens": 1024}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"parts": [{"text": "```bibtex\n@book{doe2021}\n```"}]}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let text = client_for(&server)
        .complete("secret-key", &request())
        .await
        .expect("completion ok");

    assert_eq!(text, "```bibtex\n@book{doe2021}\n```");
}

#[tokio::test]
async fn unauthorized_maps_to_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("permission denied"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .complete("bad", &request())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::AuthError);
}

#[tokio::test]
async fn invalid_key_bad_request_maps_to_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "API key not valid. Please pass a valid API key.",
                      "status": "INVALID_ARGUMENT"}
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .complete("bad", &request())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::AuthError);
}

#[tokio::test]
async fn too_many_requests_distinguishes_quota() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "busy"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too many requests"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "spent"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_string("Resource has been exhausted (e.g. check quota)."),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let busy = client.complete("busy", &request()).await.unwrap_err();
    let spent = client.complete("spent", &request()).await.unwrap_err();

    assert_eq!(busy.kind, FailureKind::RateLimited);
    assert_eq!(spent.kind, FailureKind::QuotaExceeded);
}

#[tokio::test]
async fn server_error_maps_to_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .complete("key", &request())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Network);
    assert!(err.message.contains("503"));
}

#[tokio::test]
async fn blank_candidates_map_to_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "   "}]}}]
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .complete("key", &request())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::EmptyResponse);
}

#[tokio::test]
async fn slow_transport_maps_to_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(json!({"candidates": []})),
        )
        .mount(&server)
        .await;

    let client = ReqwestCompletionClient::new(ClientSettings {
        base_url: server.uri(),
        request_timeout: Duration::from_millis(50),
        ..ClientSettings::default()
    })
    .expect("client builds");

    let err = client.complete("key", &request()).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

//! Wire-level tests for the hosted model client.

use mcq_wizard::WizardError;
use mcq_wizard::llm::{
    ChatMessage, CompletionClient, CompletionRequest, GenerationParameters, ModelCatalog,
    ModerationClient, OpenAiClient,
};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> OpenAiClient {
    let base = Url::parse(&format!("{}/v1", server.uri())).expect("mock uri");
    OpenAiClient::new(&base, "sk-test").expect("client builds")
}

fn request(model: &str, max_tokens: u32) -> CompletionRequest {
    CompletionRequest {
        parameters: GenerationParameters {
            model_identifier: model.to_string(),
            max_tokens,
            temperature: 0.7,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        },
        messages: vec![ChatMessage::user("Please write 1 question")],
    }
}

#[tokio::test]
async fn test_chat_completion_returns_text_and_usage() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4",
            "max_tokens": 500,
            "messages": [{"role": "user", "content": "Please write 1 question"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Question: What boils at 100C?"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 9, "total_tokens": 21}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server)
        .request(request("gpt-4", 500))
        .await
        .expect("completion succeeds");

    assert_eq!(response.message, "Question: What boils at 100C?");
    assert_eq!(response.tokens.prompt, 12);
    assert_eq!(response.tokens.completion, 9);
    assert_eq!(response.tokens.total, 21);
}

#[tokio::test]
async fn test_zero_max_tokens_is_omitted() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(|req: &wiremock::Request| {
            let body: serde_json::Value =
                serde_json::from_slice(&req.body).expect("json request body");
            if body.get("max_tokens").is_some() {
                ResponseTemplate::new(400)
            } else {
                ResponseTemplate::new(200).set_body_json(json!({
                    "choices": [{"message": {"role": "assistant", "content": "ok"}}]
                }))
            }
        })
        .mount(&server)
        .await;

    let response = client_for(&server)
        .request(request("gpt-3.5-turbo", 0))
        .await
        .expect("max_tokens omitted");
    assert_eq!(response.message, "ok");
    assert_eq!(response.tokens.total, 0);
}

#[tokio::test]
async fn test_rate_limit_maps_to_rate_limit_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "message": "You exceeded your current quota, please check your plan and billing details.",
                "type": "insufficient_quota"
            }
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .request(request("gpt-4", 100))
        .await
        .expect_err("rate limited");

    assert_eq!(
        err,
        WizardError::RateLimitExceeded(
            "API Error: You exceeded your current quota, please check your plan and billing details."
                .to_string()
        )
    );
    assert!(err.user_hint().is_some());
}

#[tokio::test]
async fn test_empty_choices_is_upstream_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .request(request("gpt-4", 100))
        .await
        .expect_err("no choices");
    assert!(matches!(err, WizardError::UpstreamError(_)));
}

#[tokio::test]
async fn test_moderation_collects_flagged_categories() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/moderations"))
        .and(body_partial_json(json!({"input": "some text"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "modr-1",
            "results": [{
                "flagged": true,
                "categories": {"violence": true, "hate": false, "self-harm": true}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let verdict = client_for(&server)
        .check("some text")
        .await
        .expect("moderation succeeds");

    assert!(verdict.flagged);
    let categories: Vec<&str> = verdict.categories.iter().map(String::as_str).collect();
    assert_eq!(categories, vec!["self-harm", "violence"]);
}

#[tokio::test]
async fn test_list_models_and_bad_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                {"id": "gpt-4", "object": "model"},
                {"id": "gpt-3.5-turbo", "object": "model"}
            ]
        })))
        .mount(&server)
        .await;

    let models = client_for(&server).list_models().await.expect("listing");
    assert_eq!(models, vec!["gpt-4", "gpt-3.5-turbo"]);

    let other = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided: sk-bad."}
        })))
        .mount(&other)
        .await;

    let err = client_for(&other).list_models().await.expect_err("bad key");
    assert_eq!(
        err,
        WizardError::AuthenticationFailed("API Error: Incorrect API key provided: sk-bad.".to_string())
    );
}

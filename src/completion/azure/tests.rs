use super::*;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COMPLETIONS_PATH: &str = "/openai/deployments/test-deployment/chat/completions";

fn completion_config(endpoint: &str) -> CompletionConfig {
    CompletionConfig {
        endpoint: endpoint.to_string(),
        api_version: "2024-02-01".to_string(),
        deployment: "test-deployment".to_string(),
        api_key: Some("test-key".to_string()),
        timeout_seconds: 5,
    }
}

fn client_for(server: &MockServer) -> AzureOpenAiClient {
    AzureOpenAiClient::new(&completion_config(&server.uri())).expect("Failed to create client")
}

fn reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content } }
        ]
    }))
}

#[test]
fn completions_url_includes_deployment_and_version() {
    let client = AzureOpenAiClient::new(&completion_config("https://example.openai.azure.com/"))
        .expect("Failed to create client");

    assert_eq!(
        client.completions_url.as_str(),
        "https://example.openai.azure.com/openai/deployments/test-deployment/chat/completions?api-version=2024-02-01"
    );
    assert_eq!(client.deployment(), "test-deployment");
}

#[test]
fn deployment_name_is_escaped_in_the_path() {
    let mut config = completion_config("https://example.openai.azure.com/custom/path?x=1#frag");
    config.deployment = "team/gpt?v=2#latest".to_string();

    let client = AzureOpenAiClient::new(&config).expect("Failed to create client");

    assert_eq!(
        client.completions_url.as_str(),
        "https://example.openai.azure.com/openai/deployments/team%2Fgpt%3Fv=2%23latest/chat/completions?api-version=2024-02-01"
    );
    assert_eq!(client.deployment(), "team/gpt?v=2#latest");
}

#[test]
fn invalid_config_is_rejected() {
    let mut config = completion_config("https://example.openai.azure.com");
    config.deployment = String::new();

    assert!(AzureOpenAiClient::new(&config).is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn grounded_prompt_is_sent_as_two_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .and(query_param("api-version", "2024-02-01"))
        .and(header("api-key", "test-key"))
        .and(body_json(json!({
            "messages": [
                { "role": "system", "content": "Use the following context to answer:\n\nA" },
                { "role": "user", "content": "What is A?" }
            ]
        })))
        .respond_with(reply("A is the first letter."))
        .expect(1)
        .mount(&server)
        .await;

    let answer = client_for(&server)
        .complete(&Prompt::grounded(
            "Use the following context to answer:\n\nA",
            "What is A?",
        ))
        .expect("completion should succeed");

    assert_eq!(answer, "A is the first letter.");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn generation_settings_are_sent_when_present() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .and(body_json(json!({
            "messages": [ { "role": "user", "content": "Hello" } ],
            "max_tokens": 500,
            "temperature": 0.5
        })))
        .respond_with(reply("Hi!"))
        .expect(1)
        .mount(&server)
        .await;

    let prompt = Prompt::direct("Hello")
        .with_max_tokens(500)
        .with_temperature(0.5);
    let answer = client_for(&server)
        .complete(&prompt)
        .expect("completion should succeed");

    assert_eq!(answer, "Hi!");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn service_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "code": "401", "message": "Access denied due to invalid subscription key." }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let error = client_for(&server)
        .complete(&Prompt::direct("Hello"))
        .expect_err("completion should fail");

    let message = format!("{:#}", error);
    assert!(message.contains("401"), "unexpected error: {}", message);
    assert!(
        message.contains("invalid subscription key"),
        "unexpected error: {}",
        message
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_choices_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    assert!(
        client_for(&server)
            .complete(&Prompt::direct("Hello"))
            .is_err()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn null_content_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [ { "message": { "role": "assistant", "content": null } } ]
        })))
        .mount(&server)
        .await;

    assert!(
        client_for(&server)
            .complete(&Prompt::direct("Hello"))
            .is_err()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_deployment_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(reply("late").set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let client = client_for(&server).with_timeout(Duration::from_millis(200));
    assert!(client.complete(&Prompt::direct("Hello")).is_err());
}

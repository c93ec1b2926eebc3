use httpmock::prelude::*;
use std::sync::Arc;

use refbot::config::DeepSeekConfig;
use refbot::deepseek::{ChatApi, DeepSeekClient};
use refbot::summarizer::Summarizer;
use refbot::translator::Translator;

fn test_config(server: &MockServer) -> DeepSeekConfig {
    DeepSeekConfig {
        api_url: server.url("/chat/completions"),
        model: "deepseek-chat".to_string(),
        api_key: String::new(),
        token_budget: 55_000,
    }
}

fn chat_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
}

#[tokio::test]
async fn chat_sends_bearer_token_and_model() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/chat/completions")
            .header("Authorization", "Bearer sk-test")
            .json_body_partial(r#"{"model": "deepseek-chat", "stream": false}"#);
        then.status(200).json_body(chat_body("回复内容"));
    });

    let client = DeepSeekClient::new(&test_config(&server), "sk-test".to_string()).unwrap();
    let reply = client.chat("system", "user", false).await.unwrap();

    mock.assert();
    assert_eq!(reply, "回复内容");
}

#[tokio::test]
async fn json_mode_requests_json_object_format() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/chat/completions")
            .json_body_partial(r#"{"response_format": {"type": "json_object"}}"#);
        then.status(200).json_body(chat_body(r#"{"phenomenon": "x"}"#));
    });

    let client = DeepSeekClient::new(&test_config(&server), "sk-test".to_string()).unwrap();
    client.chat("system", "user", true).await.unwrap();
    mock.assert();
}

#[tokio::test]
async fn summarizer_end_to_end_against_mock_api() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200).json_body(chat_body(
            "```json\n{\"phenomenon\": \"现象\", \"problem\": [\"（1）问题\"]}\n```",
        ));
    });

    let client = DeepSeekClient::new(&test_config(&server), "sk-test".to_string()).unwrap();
    let summarizer = Summarizer::new(Arc::new(client), 55_000);
    let value = summarizer.summarize("paper full text").await.unwrap();

    assert_eq!(value["phenomenon"], "现象");
    assert_eq!(value["problem"][0], "（1）问题");
}

#[tokio::test]
async fn translator_uses_chat_endpoint() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200).json_body(chat_body("强化学习综述"));
    });

    let client = DeepSeekClient::new(&test_config(&server), "sk-test".to_string()).unwrap();
    let translator = Translator::new(Arc::new(client));
    let out = translator
        .translate_to_chinese("A survey of reinforcement learning")
        .await
        .unwrap();
    assert_eq!(out, "强化学习综述");
}

#[tokio::test]
async fn api_error_surfaces_after_retries() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(500).body("internal error");
    });

    let client = DeepSeekClient::new(&test_config(&server), "sk-test".to_string()).unwrap();
    let err = client.chat("system", "user", false).await.unwrap_err();

    assert!(err.to_string().contains("API 返回错误"));
    // 瞬时错误按 3 次重试
    assert_eq!(mock.hits(), 3);
}

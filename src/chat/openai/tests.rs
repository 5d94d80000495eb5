use super::*;
use crate::chat::Role;
use crate::config::ChatConfig;

fn test_config() -> ChatConfig {
    ChatConfig {
        endpoint: "http://localhost:9999/v1".to_string(),
        api_key: "test-key".to_string(),
        model: "test-chat-model".to_string(),
    }
}

#[test]
fn client_configuration() {
    let client = OpenAiChatClient::new(&test_config()).expect("Failed to create client");

    assert_eq!(client.model, "test-chat-model");
    assert_eq!(client.base_url.host_str(), Some("localhost"));
    assert_eq!(client.base_url.port(), Some(9999));
}

#[test]
fn completions_url_joins_path() {
    let client = OpenAiChatClient::new(&test_config()).expect("Failed to create client");
    let url = client.completions_url().expect("should build URL");

    assert_eq!(url.as_str(), "http://localhost:9999/v1/chat/completions");
}

#[test]
fn empty_message_sequence_fails_without_network() {
    let client = OpenAiChatClient::new(&test_config()).expect("Failed to create client");

    let result = client.complete(&[]);
    assert!(matches!(result, Err(RagError::InvalidInput(_))));
}

#[test]
fn message_roles_serialize_lowercase() {
    let messages = vec![
        ChatMessage::system("instructions"),
        ChatMessage::user("question"),
        ChatMessage {
            role: Role::Assistant,
            content: "answer".to_string(),
        },
    ];

    let json = serde_json::to_string(&messages).expect("should serialize messages");
    assert!(json.contains("\"role\":\"system\""));
    assert!(json.contains("\"role\":\"user\""));
    assert!(json.contains("\"role\":\"assistant\""));
}

#[test]
fn completion_response_parsing() {
    let body = r#"{
        "choices": [
            {"message": {"role": "assistant", "content": "first"}},
            {"message": {"role": "assistant", "content": "second"}}
        ]
    }"#;

    let response: CompletionResponse = serde_json::from_str(body).expect("should parse response");
    let first = response
        .choices
        .into_iter()
        .next()
        .expect("should have a choice");
    assert_eq!(first.message.content, "first");
}

#[test]
fn error_classification() {
    assert!(matches!(
        classify_transport_error(ureq::Error::StatusCode(429)),
        RagError::RateLimited(_)
    ));
    assert!(matches!(
        classify_transport_error(ureq::Error::StatusCode(503)),
        RagError::ProviderUnavailable(_)
    ));
    assert!(matches!(
        classify_transport_error(ureq::Error::HostNotFound),
        RagError::ProviderUnavailable(_)
    ));
}

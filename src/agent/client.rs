//! Model client for the Anthropic Messages API.
//!
//! The analyzer talks to the model through the [`ModelClient`] trait so the
//! HTTP client is built once per process and tests can swap in a fake.

use crate::error::AnalysisError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Version header required by the Messages API.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Configuration for the model client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub api_key: String,
    pub model_name: String,
    pub timeout_seconds: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.anthropic.com".to_string(),
            api_key: String::new(),
            model_name: "claude-sonnet-4-20250514".to_string(),
            timeout_seconds: 120,
        }
    }
}

/// Message in the conversation sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn user(content: MessageContent) -> Self {
        Self {
            role: "user".to_string(),
            content,
        }
    }
}

/// Plain text, or a list of content blocks for document uploads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
    Document { source: DocumentSource },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub media_type: String,
    pub data: String,
}

impl DocumentSource {
    pub fn base64(media_type: &str, data: String) -> Self {
        Self {
            source_type: "base64".to_string(),
            media_type: media_type.to_string(),
            data,
        }
    }
}

/// Text returned by a model call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    pub text: String,
}

/// A single-shot model call.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn invoke(
        &self,
        system: &str,
        messages: Vec<ChatMessage>,
        max_output_tokens: u32,
    ) -> Result<ModelReply, AnalysisError>;
}

/// Messages API request.
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ChatMessage>,
}

/// Messages API response.
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

impl MessagesResponse {
    /// Concatenate every text block, ignoring other block types.
    fn text(&self) -> String {
        self.content
            .iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text.as_deref())
            .collect()
    }
}

/// HTTP client for the Anthropic Messages API.
pub struct AnthropicClient {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(config: ClientConfig) -> Result<Self, AnalysisError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AnalysisError::Upstream(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.config.api_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ModelClient for AnthropicClient {
    async fn invoke(
        &self,
        system: &str,
        messages: Vec<ChatMessage>,
        max_output_tokens: u32,
    ) -> Result<ModelReply, AnalysisError> {
        let url = self.endpoint();

        let request = MessagesRequest {
            model: &self.config.model_name,
            max_tokens: max_output_tokens,
            system,
            messages,
        };

        debug!(
            "Sending messages request to {} (max_tokens {})",
            url, max_output_tokens
        );

        let response = self
            .http_client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalysisError::Upstream(format!(
                        "Request timed out after {}s",
                        self.config.timeout_seconds
                    ))
                } else if e.is_connect() {
                    AnalysisError::Upstream(format!(
                        "Cannot connect to model API at {}",
                        self.config.api_url
                    ))
                } else {
                    AnalysisError::Upstream(format!("Failed to send request: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Upstream(format!(
                "Model API error {}: {}",
                status, body
            )));
        }

        let messages_response: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::Upstream(format!("Failed to decode API response: {}", e)))?;

        if let Some(ref reason) = messages_response.stop_reason {
            debug!("Model stopped: {}", reason);
        }

        Ok(ModelReply {
            text: messages_response.text(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Serve one canned HTTP response on a local port and return the base URL.
    async fn serve_once(response: String) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&received);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if received.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{}", addr)
    }

    fn local_client(api_url: String) -> AnthropicClient {
        AnthropicClient::new(ClientConfig {
            api_url,
            api_key: "test-key".to_string(),
            timeout_seconds: 5,
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_non_success_status_is_upstream_error() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let url = serve_once(format!(
            "HTTP/1.1 529 Site Overloaded\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        ))
        .await;

        let err = local_client(url)
            .invoke("system", vec![ChatMessage::user(MessageContent::Text("hi".to_string()))], 16)
            .await
            .unwrap_err();

        match err {
            AnalysisError::Upstream(message) => {
                assert!(message.contains("529"), "{}", message);
                assert!(message.contains("overloaded_error"));
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_success_reply_text() {
        let body = r#"{"content":[{"type":"text","text":"{\"ok\": true}"}],"stop_reason":"end_turn"}"#;
        let url = serve_once(format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        ))
        .await;

        let reply = local_client(url)
            .invoke("system", vec![ChatMessage::user(MessageContent::Text("hi".to_string()))], 16)
            .await
            .unwrap();
        assert_eq!(reply.text, "{\"ok\": true}");
    }

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.model_name, "claude-sonnet-4-20250514");
        assert_eq!(config.timeout_seconds, 120);
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let client = AnthropicClient::new(ClientConfig {
            api_url: "http://localhost:8080/".to_string(),
            ..ClientConfig::default()
        })
        .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/messages");
    }

    #[test]
    fn test_document_message_shape() {
        let message = ChatMessage::user(MessageContent::Blocks(vec![
            ContentBlock::Document {
                source: DocumentSource::base64("application/pdf", "JVBERi0=".to_string()),
            },
            ContentBlock::Text {
                text: "Analyze this PDF document \"a.pdf\".".to_string(),
            },
        ]));

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({
                "role": "user",
                "content": [
                    {
                        "type": "document",
                        "source": {"type": "base64", "media_type": "application/pdf", "data": "JVBERi0="}
                    },
                    {"type": "text", "text": "Analyze this PDF document \"a.pdf\"."}
                ]
            })
        );
    }

    #[test]
    fn test_text_message_shape() {
        let message = ChatMessage::user(MessageContent::Text("hello".to_string()));
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "hello"}));
    }

    #[test]
    fn test_response_text_joins_text_blocks() {
        let response: MessagesResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "{\"a\":"},
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": " 1}"}
            ],
            "stop_reason": "end_turn"
        }))
        .unwrap();

        assert_eq!(response.text(), "{\"a\": 1}");
    }
}

//! OpenAI Provider - Implementation of AIProvider for OpenAI's chat completions API.
//!
//! # Configuration
//!
//! ```ignore
//! let config = OpenAIConfig::new(api_key)
//!     .with_model("gpt-4")
//!     .with_base_url("https://api.openai.com/v1");
//!
//! let provider = OpenAIProvider::new(config)?;
//! ```
//!
//! # Wire format
//!
//! `POST {base_url}/chat/completions` with a bearer token and a JSON body of
//! `model`, `messages` (system message first), `max_tokens` and `temperature`.
//! The generated text is the first choice's `message.content`.

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::AiConfig;
use crate::ports::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, FinishReason, TokenUsage,
};

/// Longest slice of an error body kept in errors and logs.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Configuration for the OpenAI provider.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication.
    api_key: Secret<String>,
    /// Model to use (e.g., "gpt-4").
    pub model: String,
    /// Base URL for the API (default: https://api.openai.com/v1).
    pub base_url: String,
    /// HTTP request timeout.
    pub timeout: Duration,
}

impl OpenAIConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "gpt-4".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Builds the provider configuration from application settings.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if no API key is configured
    pub fn from_settings(settings: &AiConfig) -> Result<Self, AIError> {
        let api_key = settings
            .api_key()
            .ok_or_else(|| AIError::InvalidRequest("OPENAI_API_KEY is not set".to_string()))?;

        Ok(Self::new(api_key)
            .with_model(&settings.model)
            .with_base_url(&settings.base_url)
            .with_timeout(settings.timeout()))
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Exposes the API key (for making requests).
    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// OpenAI API provider implementation.
pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIProvider {
    /// Creates a new OpenAI provider with the given configuration.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if the HTTP client cannot be built
    pub fn new(config: OpenAIConfig) -> Result<Self, AIError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AIError::InvalidRequest(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Builds the chat completions endpoint URL.
    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    /// Converts our request to OpenAI's format.
    fn to_openai_request(&self, request: &CompletionRequest) -> OpenAIRequest {
        let system = request.system_prompt.as_ref().map(|prompt| OpenAIMessage {
            role: "system".to_string(),
            content: prompt.clone(),
        });

        let messages = system
            .into_iter()
            .chain(request.messages.iter().map(|msg| OpenAIMessage {
                role: msg.role.as_str().to_string(),
                content: msg.content.clone(),
            }))
            .collect();

        OpenAIRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }

    /// Sends a request and maps transport failures.
    async fn send_request(&self, request: &CompletionRequest) -> Result<Response, AIError> {
        let openai_request = self.to_openai_request(request);

        tracing::debug!(
            trace_id = %request.metadata.trace_id,
            model = %openai_request.model,
            messages = openai_request.messages.len(),
            "Sending chat completion request"
        );

        self.client
            .post(self.completions_url())
            .bearer_auth(self.config.api_key())
            .json(&openai_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AIError::Timeout {
                        timeout_ms: self.config.timeout.as_millis() as u64,
                    }
                } else if e.is_connect() {
                    AIError::network(format!("Connection failed: {}", e))
                } else {
                    AIError::network(e.to_string())
                }
            })
    }

    /// Rejects non-success statuses, keeping the status code.
    async fn handle_response_status(&self, response: Response) -> Result<Response, AIError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let body = truncate(&body, MAX_ERROR_BODY_CHARS);

        tracing::warn!(
            status = status.as_u16(),
            response = %body,
            "Chat completion request failed"
        );

        Err(AIError::status(status.as_u16(), body))
    }

    /// Parses a non-streaming response body.
    async fn parse_response(&self, response: Response) -> Result<CompletionResponse, AIError> {
        let response = self.handle_response_status(response).await?;

        let body = response
            .text()
            .await
            .map_err(|e| AIError::network(format!("Failed to read response body: {}", e)))?;

        parse_completion_body(&body, &self.config.model)
    }
}

#[async_trait]
impl AIProvider for OpenAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        let response = self.send_request(&request).await?;
        self.parse_response(response).await
    }
}

/// Extracts the first choice from a chat completion body.
fn parse_completion_body(body: &str, requested_model: &str) -> Result<CompletionResponse, AIError> {
    let openai_response: OpenAIResponse = serde_json::from_str(body)
        .map_err(|e| AIError::parse(format!("Failed to parse response: {}", e)))?;

    let choice = openai_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AIError::parse("no question generated: response has no choices"))?;

    let content = choice
        .message
        .content
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| AIError::parse("first choice has no message content"))?;

    let usage = openai_response
        .usage
        .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
        .unwrap_or_default();

    Ok(CompletionResponse {
        content,
        usage,
        model: openai_response
            .model
            .unwrap_or_else(|| requested_model.to_string()),
        finish_reason: FinishReason::from_wire(choice.finish_reason.as_deref()),
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}

// ----- OpenAI API Types -----

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ConversationId, QuestionId};
    use crate::ports::{MessageRole, RequestMetadata};

    fn request() -> CompletionRequest {
        CompletionRequest::new(RequestMetadata::new(
            ConversationId::new(1),
            QuestionId::new(1),
            "trace-1",
        ))
        .with_system_prompt("You are conducting a technical interview.")
        .with_message(MessageRole::Assistant, "What is a linked list?")
        .with_message(MessageRole::User, "A sequence of nodes...")
        .with_max_tokens(150)
        .with_temperature(0.7)
    }

    fn provider_for(server: &mockito::Server) -> OpenAIProvider {
        let config = OpenAIConfig::new("test-key").with_base_url(server.url());
        OpenAIProvider::new(config).unwrap()
    }

    #[test]
    fn config_builder_works() {
        let config = OpenAIConfig::new("test-key")
            .with_model("gpt-4o")
            .with_base_url("https://custom.api.com/v1/")
            .with_timeout(Duration::from_secs(30));

        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.base_url, "https://custom.api.com/v1");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.api_key(), "test-key");
    }

    #[test]
    fn debug_output_hides_api_key() {
        let config = OpenAIConfig::new("sk-very-secret");
        assert!(!format!("{:?}", config).contains("sk-very-secret"));
    }

    #[test]
    fn request_puts_system_message_first() {
        let provider = OpenAIProvider::new(OpenAIConfig::new("k")).unwrap();
        let body = serde_json::to_value(provider.to_openai_request(&request())).unwrap();

        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["max_tokens"], 150);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "assistant");
        assert_eq!(body["messages"][2]["role"], "user");
        assert_eq!(body["messages"].as_array().unwrap().len(), 3);
    }

    mod parsing {
        use super::*;

        #[test]
        fn extracts_first_choice_content() {
            let body = r#"{"model":"gpt-4-0613","choices":[{"message":{"role":"assistant","content":"How would you reverse it?"},"finish_reason":"stop"}],"usage":{"prompt_tokens":40,"completion_tokens":8}}"#;
            let response = parse_completion_body(body, "gpt-4").unwrap();

            assert_eq!(response.content, "How would you reverse it?");
            assert_eq!(response.model, "gpt-4-0613");
            assert_eq!(response.usage.total_tokens, 48);
            assert_eq!(response.finish_reason, FinishReason::Stop);
        }

        #[test]
        fn empty_choices_is_parse_error() {
            let err = parse_completion_body(r#"{"choices":[]}"#, "gpt-4").unwrap_err();
            assert!(matches!(err, AIError::Parse(_)));
        }

        #[test]
        fn missing_choices_is_parse_error() {
            let err = parse_completion_body(r#"{"error":"nope"}"#, "gpt-4").unwrap_err();
            assert!(matches!(err, AIError::Parse(_)));
        }

        #[test]
        fn wrong_type_is_parse_error() {
            let err = parse_completion_body(r#"{"choices":"many"}"#, "gpt-4").unwrap_err();
            assert!(matches!(err, AIError::Parse(_)));

            let err = parse_completion_body(r#"{"choices":[{"message":{"content":42}}]}"#, "gpt-4")
                .unwrap_err();
            assert!(matches!(err, AIError::Parse(_)));
        }

        #[test]
        fn null_or_blank_content_is_parse_error() {
            let err = parse_completion_body(r#"{"choices":[{"message":{"content":null}}]}"#, "gpt-4")
                .unwrap_err();
            assert!(matches!(err, AIError::Parse(_)));

            let err = parse_completion_body(r#"{"choices":[{"message":{"content":"  "}}]}"#, "gpt-4")
                .unwrap_err();
            assert!(matches!(err, AIError::Parse(_)));
        }

        #[test]
        fn invalid_json_is_parse_error() {
            let err = parse_completion_body("<html>bad gateway</html>", "gpt-4").unwrap_err();
            assert!(matches!(err, AIError::Parse(_)));
        }

        #[test]
        fn truncate_respects_char_boundaries() {
            assert_eq!(truncate("héllo", 2), "hé...");
            assert_eq!(truncate("short", 10), "short");
        }
    }

    mod http {
        use super::*;
        use mockito::Matcher;

        #[tokio::test]
        async fn posts_bearer_authenticated_request() {
            let mut server = mockito::Server::new_async().await;
            let mock = server
                .mock("POST", "/chat/completions")
                .match_header("authorization", "Bearer test-key")
                .match_body(Matcher::PartialJson(serde_json::json!({
                    "model": "gpt-4",
                    "max_tokens": 150,
                    "messages": [{"role": "system"}, {"role": "assistant"}, {"role": "user"}]
                })))
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(r#"{"choices":[{"message":{"content":"What is a doubly linked list?"}}]}"#)
                .create_async()
                .await;

            let response = provider_for(&server).complete(request()).await.unwrap();

            assert_eq!(response.content, "What is a doubly linked list?");
            mock.assert_async().await;
        }

        #[tokio::test]
        async fn server_error_keeps_status_code() {
            let mut server = mockito::Server::new_async().await;
            server
                .mock("POST", "/chat/completions")
                .with_status(500)
                .with_body("internal error")
                .create_async()
                .await;

            let err = provider_for(&server).complete(request()).await.unwrap_err();

            assert_eq!(err, AIError::status(500, "internal error"));
        }

        #[tokio::test]
        async fn unauthorized_is_status_error() {
            let mut server = mockito::Server::new_async().await;
            server
                .mock("POST", "/chat/completions")
                .with_status(401)
                .create_async()
                .await;

            let err = provider_for(&server).complete(request()).await.unwrap_err();

            assert!(matches!(err, AIError::Status { status: 401, .. }));
        }

        #[tokio::test]
        async fn malformed_body_is_parse_error() {
            let mut server = mockito::Server::new_async().await;
            server
                .mock("POST", "/chat/completions")
                .with_status(200)
                .with_body(r#"{"choices":[]}"#)
                .create_async()
                .await;

            let err = provider_for(&server).complete(request()).await.unwrap_err();

            assert!(matches!(err, AIError::Parse(_)));
        }

        #[tokio::test]
        async fn unreachable_host_is_network_error() {
            let config = OpenAIConfig::new("k").with_base_url("http://127.0.0.1:1");
            let provider = OpenAIProvider::new(config).unwrap();

            let err = provider.complete(request()).await.unwrap_err();

            assert!(err.is_transport());
        }
    }
}

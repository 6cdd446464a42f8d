// ABOUTME: OpenAI-compatible chat completions provider for hosted endpoints
// ABOUTME: Serves both OpenAI and Groq through one request/response codec
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

//! # `OpenAI`-Compatible Provider
//!
//! `OpenAI` and Groq speak the same chat completions dialect and differ only
//! in base URL, key and default model, so both are [`OpenAiCompatibleConfig`]
//! presets over one client. Only the first choice of a completion is read;
//! diet prompts never ask for more than one. A JSON mode request is sent with
//! `response_format: {"type": "json_object"}`.
//!
//! ```rust,no_run
//! use aidiet_server::errors::AppError;
//! use aidiet_server::llm::{ChatMessage, ChatRequest, LlmProvider, OpenAiCompatibleConfig, OpenAiCompatibleProvider};
//!
//! # async fn run() -> Result<(), AppError> {
//! let provider = OpenAiCompatibleProvider::new(OpenAiCompatibleConfig::groq("gsk-test", None))?;
//! let reply = provider
//!     .complete(&ChatRequest::new(vec![ChatMessage::user("Какво да ям за закуска?")]))
//!     .await?;
//! println!("{}", reply.content);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::http_failure::{status_failure, transport_failure};
use super::{ChatRequest, ChatResponse, LlmCapabilities, LlmProvider, TokenUsage};
use crate::errors::AppError;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
const GROQ_DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Connection timeout for hosted endpoints
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Transport ceiling; the invoker enforces the real per-call deadline
const TRANSPORT_TIMEOUT_SECS: u64 = 300;

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionReply {
    model: String,
    #[serde(default)]
    choices: Vec<ReplyChoice>,
    #[serde(default)]
    usage: Option<ReplyUsage>,
}

#[derive(Debug, Deserialize)]
struct ReplyChoice {
    message: ReplyMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReplyUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct FailureBody {
    error: FailureDetail,
}

#[derive(Debug, Deserialize)]
struct FailureDetail {
    message: String,
}

fn encode_request<'a>(model: &'a str, request: &'a ChatRequest) -> CompletionBody<'a> {
    CompletionBody {
        model,
        messages: request
            .messages
            .iter()
            .map(|message| WireMessage {
                role: message.role.as_str(),
                content: &message.content,
            })
            .collect(),
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        response_format: request.json_mode.then_some(ResponseFormat {
            kind: "json_object",
        }),
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Endpoint preset for the `OpenAI`-compatible provider
#[derive(Clone)]
pub struct OpenAiCompatibleConfig {
    /// Base URL, without the `/chat/completions` suffix
    pub base_url: String,
    /// Bearer token
    pub api_key: String,
    /// Model used when the request names none
    pub default_model: String,
    /// Identifier for logs (`openai` or `groq`)
    pub provider_name: &'static str,
    /// Name used in client-facing errors
    pub display_name: &'static str,
    /// Capabilities of this endpoint
    pub capabilities: LlmCapabilities,
}

impl OpenAiCompatibleConfig {
    /// `OpenAI` preset, `gpt-4o-mini` unless `model` is given
    #[must_use]
    pub fn openai(api_key: impl Into<String>, model: Option<String>) -> Self {
        Self {
            base_url: OPENAI_BASE_URL.to_owned(),
            api_key: api_key.into(),
            default_model: model.unwrap_or_else(|| OPENAI_DEFAULT_MODEL.to_owned()),
            provider_name: "openai",
            display_name: "OpenAI",
            capabilities: LlmCapabilities::hosted(),
        }
    }

    /// Groq preset, `llama-3.3-70b-versatile` unless `model` is given
    #[must_use]
    pub fn groq(api_key: impl Into<String>, model: Option<String>) -> Self {
        Self {
            base_url: GROQ_BASE_URL.to_owned(),
            api_key: api_key.into(),
            default_model: model.unwrap_or_else(|| GROQ_DEFAULT_MODEL.to_owned()),
            provider_name: "groq",
            display_name: "Groq",
            capabilities: LlmCapabilities::hosted(),
        }
    }

    /// Point the preset at another base URL (proxies, local test servers)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }
}

impl fmt::Debug for OpenAiCompatibleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCompatibleConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("default_model", &self.default_model)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Provider
// ============================================================================

/// Chat completions client for one `OpenAI`-compatible endpoint
#[derive(Debug)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    config: OpenAiCompatibleConfig,
}

impl OpenAiCompatibleProvider {
    /// Create a provider for `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: OpenAiCompatibleConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(TRANSPORT_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn decode_reply(&self, body: &str, model: &str) -> Result<ChatResponse, AppError> {
        let service = self.config.display_name;
        let reply: CompletionReply = serde_json::from_str(body).map_err(|e| {
            AppError::external_service(service, format!("Failed to parse response: {e}"))
        })?;
        let choice = reply
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::external_service(service, "API returned no choices"))?;

        debug!(
            model,
            finish_reason = ?choice.finish_reason,
            "Chat completion received"
        );
        Ok(ChatResponse {
            content: choice.message.content.unwrap_or_default(),
            model: reply.model,
            usage: reply.usage.map(|usage| TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            }),
            finish_reason: choice.finish_reason,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &'static str {
        self.config.provider_name
    }

    fn display_name(&self) -> &'static str {
        self.config.display_name
    }

    fn capabilities(&self) -> LlmCapabilities {
        self.config.capabilities
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    #[instrument(skip_all, fields(provider = self.config.provider_name))]
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        let service = self.config.display_name;
        let model = request
            .model
            .as_deref()
            .unwrap_or(&self.config.default_model);
        let response = self
            .client
            .post(self.config.endpoint("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&encode_request(model, request))
            .send()
            .await
            .map_err(|e| transport_failure(service, &e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            AppError::external_service(service, format!("Failed to read response: {e}"))
        })?;
        if !status.is_success() {
            let detail = serde_json::from_str::<FailureBody>(&text)
                .map_or(text, |failure| failure.error.message);
            return Err(status_failure(service, status, &detail));
        }

        self.decode_reply(&text, model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;

    fn provider() -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new(OpenAiCompatibleConfig::openai("sk-test", None)).unwrap()
    }

    #[test]
    fn test_presets() {
        let openai = OpenAiCompatibleConfig::openai("k", None);
        assert_eq!(openai.default_model, "gpt-4o-mini");
        assert_eq!(openai.provider_name, "openai");

        let groq = OpenAiCompatibleConfig::groq("k", Some("llama-3.1-8b-instant".to_owned()));
        assert_eq!(groq.default_model, "llama-3.1-8b-instant");
        assert_eq!(groq.base_url, GROQ_BASE_URL);
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", OpenAiCompatibleConfig::openai("sk-secret", None));
        assert!(!rendered.contains("sk-secret"));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config =
            OpenAiCompatibleConfig::openai("k", None).with_base_url("http://localhost:8080/v1/");
        assert_eq!(
            config.endpoint("chat/completions"),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let request = ChatRequest::new(vec![ChatMessage::user("Здравей")]).with_max_tokens(500);
        let value = serde_json::to_value(encode_request("gpt-4o-mini", &request)).unwrap();
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["max_tokens"], 500);
        assert!(value.get("temperature").is_none());
        assert!(value.get("response_format").is_none());
    }

    #[test]
    fn test_json_mode_sets_response_format() {
        let request = ChatRequest::new(vec![
            ChatMessage::system("Отговори само с JSON."),
            ChatMessage::user("Анализ"),
        ])
        .with_json_mode();
        let value = serde_json::to_value(encode_request("llama-3.3-70b-versatile", &request)).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(value["messages"][0]["role"], "system");
        assert!(OpenAiCompatibleConfig::groq("k", None)
            .capabilities
            .supports_json_mode());
    }

    #[test]
    fn test_decode_reply() {
        let body = r#"{
            "model": "gpt-4o-mini-2024",
            "choices": [{"message": {"content": "{\"bmr\": 1700}"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let reply = provider().decode_reply(body, "gpt-4o-mini").unwrap();
        assert_eq!(reply.content, "{\"bmr\": 1700}");
        assert_eq!(reply.usage.unwrap().total_tokens, 15);

        assert!(provider()
            .decode_reply(r#"{"model": "x", "choices": []}"#, "x")
            .is_err());
    }
}

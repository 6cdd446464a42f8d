// ABOUTME: LLM provider abstraction layer for pluggable text generation backends
// ABOUTME: Defines the provider contract, message types, and the monitored invocation seam
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

//! # LLM Provider Service Provider Interface
//!
//! Every backend (`OpenAI`, Groq, Gemini, and the offline mock) implements
//! [`LlmProvider`]. The diet pipeline and the chat orchestrator never talk to a
//! provider directly; they go through [`ModelInvoker`], which takes a single
//! prompt and an output cap and returns text. [`MonitoredInvoker`] is the
//! production implementation that adds token logging, a timeout and empty
//! reply rejection on top of any provider. It also reads the provider's
//! [`LlmCapabilities`]: structured steps get a JSON-only system message and
//! JSON mode where the backend offers them.
//!
//! ## Example: Using a Provider
//!
//! ```rust,no_run
//! use aidiet_server::llm::{ChatMessage, ChatRequest, LlmProvider, MockProvider};
//!
//! async fn example() {
//!     let provider = MockProvider::new();
//!     let request = ChatRequest::new(vec![ChatMessage::user("Колко калории има в ябълка?")]);
//!     let response = provider.complete(&request).await;
//! }
//! ```

mod gemini;
mod http_failure;
mod invoker;
mod mock;
mod openai_compatible;
mod provider;
pub mod response_parser;

pub use gemini::GeminiProvider;
pub use invoker::{ModelInvoker, MonitoredInvoker, CHAT_STEP};
pub use mock::MockProvider;
pub use openai_compatible::{OpenAiCompatibleConfig, OpenAiCompatibleProvider};
pub use provider::ChatProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

// ============================================================================
// Capabilities
// ============================================================================

bitflags::bitflags! {
    /// Features a backend offers beyond plain text completion
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct LlmCapabilities: u8 {
        /// Provider supports JSON mode output
        const JSON_MODE = 0b0000_0001;
        /// Provider supports system messages
        const SYSTEM_MESSAGES = 0b0000_0010;
        /// Provider produces canned output without network access
        const OFFLINE = 0b0000_0100;
    }
}

impl LlmCapabilities {
    /// Capabilities of a hosted chat completion endpoint
    #[must_use]
    pub const fn hosted() -> Self {
        Self::JSON_MODE.union(Self::SYSTEM_MESSAGES)
    }

    /// Backend can be forced to answer with a JSON object
    #[must_use]
    pub const fn supports_json_mode(&self) -> bool {
        self.contains(Self::JSON_MODE)
    }

    /// Backend honours a leading system message
    #[must_use]
    pub const fn supports_system_messages(&self) -> bool {
        self.contains(Self::SYSTEM_MESSAGES)
    }

    /// Backend answers without touching the network
    #[must_use]
    pub const fn is_offline(&self) -> bool {
        self.contains(Self::OFFLINE)
    }
}

// ============================================================================
// Prompt types
// ============================================================================

/// Author of a prompt message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instruction message
    System,
    /// User input message
    User,
    /// Assistant response message
    Assistant,
}

impl MessageRole {
    /// Wire name shared by every chat completions dialect
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One prompt message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who wrote it
    pub role: MessageRole,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Message with an explicit role
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// System instruction
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// User turn
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }
}

// ============================================================================
// Completion call
// ============================================================================

/// Sampling temperature used for every diet prompt
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// One completion call: the prompt plus sampling limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Prompt messages in order
    pub messages: Vec<ChatMessage>,
    /// Backend model name; the provider default when absent
    pub model: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Output token cap
    pub max_tokens: Option<u32>,
    /// Ask the backend to constrain the reply to one JSON object
    #[serde(default)]
    pub json_mode: bool,
}

impl ChatRequest {
    /// Request with backend defaults for everything but the prompt
    #[must_use]
    pub const fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: None,
            temperature: None,
            max_tokens: None,
            json_mode: false,
        }
    }

    /// Pin the backend model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Override sampling temperature
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Cap the reply length
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Constrain the reply to a JSON object
    #[must_use]
    pub const fn with_json_mode(mut self) -> Self {
        self.json_mode = true;
        self
    }

    /// Text of the last user message, or empty
    #[must_use]
    pub fn last_user_text(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == MessageRole::User)
            .map_or("", |message| message.content.as_str())
    }
}

/// Text returned by a backend with its bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Reply text
    pub content: String,
    /// Model that actually answered
    pub model: String,
    /// Token accounting, when the backend reports it
    pub usage: Option<TokenUsage>,
    /// Why generation stopped (`stop`, `length`)
    pub finish_reason: Option<String>,
}

/// Token counts reported by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt side
    pub prompt_tokens: u32,
    /// Reply side
    pub completion_tokens: u32,
    /// Sum of both
    pub total_tokens: u32,
}

// ============================================================================
// Backend contract
// ============================================================================

/// A text generation backend
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Lowercase identifier used in config and logs
    fn name(&self) -> &'static str;

    /// Name shown in client-facing errors
    fn display_name(&self) -> &'static str;

    /// Feature flags
    fn capabilities(&self) -> LlmCapabilities;

    /// Model used when a request names none
    fn default_model(&self) -> &str;

    /// Run one completion
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosted_capabilities() {
        let caps = LlmCapabilities::hosted();
        assert!(caps.supports_json_mode());
        assert!(caps.supports_system_messages());
        assert!(!caps.is_offline());
    }

    #[test]
    fn test_request_builder() {
        let request = ChatRequest::new(vec![
            ChatMessage::system("Ти си диетолог."),
            ChatMessage::user("Здравей"),
        ])
        .with_model("gpt-4o-mini")
        .with_temperature(DEFAULT_TEMPERATURE)
        .with_max_tokens(2000);

        assert_eq!(request.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(request.max_tokens, Some(2000));
        assert_eq!(request.last_user_text(), "Здравей");
        assert!(!request.json_mode);
        assert!(request.with_json_mode().json_mode);
    }
}

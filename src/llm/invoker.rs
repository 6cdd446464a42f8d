// ABOUTME: Prompt-in, text-out invocation seam used by the pipeline and chat orchestrator
// ABOUTME: MonitoredInvoker shapes requests to provider capabilities, then times and checks each call
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

use std::time::{Duration, Instant};

use aidiet_core::constants::budgets::{LARGE_PROMPT_ERROR_TOKENS, LARGE_PROMPT_WARN_TOKENS};
use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use super::{ChatMessage, ChatRequest, LlmProvider, DEFAULT_TEMPERATURE};
use crate::errors::{AppError, AppResult};
use crate::intelligence::estimate_tokens;
use crate::logging::AppLogger;

/// Step name of free-text chat replies; every other step expects a JSON object
pub const CHAT_STEP: &str = "chat";

/// System instruction sent ahead of structured prompts when the backend honours one
const JSON_ONLY_INSTRUCTION: &str =
    "Ти си професионален диетолог. Отговаряй само с един валиден JSON обект, без текст преди или след него.";

/// The opaque text generation collaborator
///
/// `step` names the caller (`analysis`, `strategy`, `plan`, `fallback`,
/// `plan_correction`, [`CHAT_STEP`]) for logging and error messages. A reply
/// that cannot be obtained in full is an error; implementations never return
/// partial text.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Send one prompt and return the reply text
    async fn invoke(&self, prompt: &str, max_tokens: u32, step: &str) -> AppResult<String>;
}

/// Production invoker wrapping an [`LlmProvider`]
pub struct MonitoredInvoker<P> {
    provider: P,
    model: Option<String>,
    timeout: Duration,
}

impl<P: LlmProvider> MonitoredInvoker<P> {
    /// Wrap `provider` with a per-call timeout
    #[must_use]
    pub const fn new(provider: P, timeout: Duration) -> Self {
        Self {
            provider,
            model: None,
            timeout,
        }
    }

    /// Override the provider's default model
    #[must_use]
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// Wrapped provider
    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Request for one prompt, shaped to what the provider supports
    ///
    /// Structured steps get a JSON-only system message and JSON mode when
    /// the provider offers them. Chat replies are free text and get neither.
    fn build_request(&self, prompt: &str, max_tokens: u32, step: &str) -> ChatRequest {
        let capabilities = self.provider.capabilities();
        let structured = step != CHAT_STEP;

        let mut messages = Vec::with_capacity(2);
        if structured && capabilities.supports_system_messages() {
            messages.push(ChatMessage::system(JSON_ONLY_INSTRUCTION));
        }
        messages.push(ChatMessage::user(prompt));

        let mut request = ChatRequest::new(messages)
            .with_temperature(DEFAULT_TEMPERATURE)
            .with_max_tokens(max_tokens);
        if structured && capabilities.supports_json_mode() {
            request = request.with_json_mode();
        }
        if let Some(model) = &self.model {
            request = request.with_model(model.clone());
        }
        request
    }

    fn log_prompt_size(step: &str, input_tokens: usize) {
        if input_tokens > LARGE_PROMPT_ERROR_TOKENS {
            error!(
                step,
                input_tokens, "Very large input prompt, review the calling step"
            );
        } else if input_tokens > LARGE_PROMPT_WARN_TOKENS {
            warn!(step, input_tokens, "Large input prompt");
        }
    }
}

#[async_trait]
impl<P: LlmProvider> ModelInvoker for MonitoredInvoker<P> {
    async fn invoke(&self, prompt: &str, max_tokens: u32, step: &str) -> AppResult<String> {
        let input_tokens = estimate_tokens(prompt);
        Self::log_prompt_size(step, input_tokens);

        let request = self.build_request(prompt, max_tokens, step);

        let started = Instant::now();
        let outcome = timeout(self.timeout, self.provider.complete(&request)).await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let result = match outcome {
            Err(_) => Err(AppError::model_timeout(step, self.timeout.as_secs())),
            Ok(Err(e)) => Err(e),
            Ok(Ok(response)) if response.content.trim().is_empty() => {
                Err(AppError::malformed_output(step, "empty reply"))
            }
            Ok(Ok(response)) => Ok(response.content),
        };

        AppLogger::log_model_invocation(step, input_tokens, Some(max_tokens), duration_ms, result.is_ok());
        match &result {
            Ok(reply) => debug!(step, output_tokens = estimate_tokens(reply), "Model reply received"),
            Err(e) => warn!(step, provider = self.provider.name(), error = %e, "Model invocation failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;
    use crate::llm::{ChatResponse, LlmCapabilities, MessageRole, MockProvider};
    use std::sync::Mutex;
    use tokio::time::sleep;

    struct SlowProvider;

    #[async_trait]
    impl LlmProvider for SlowProvider {
        fn name(&self) -> &'static str {
            "slow"
        }
        fn display_name(&self) -> &'static str {
            "Slow"
        }
        fn capabilities(&self) -> LlmCapabilities {
            LlmCapabilities::empty()
        }
        fn default_model(&self) -> &str {
            "slow"
        }
        async fn complete(&self, _request: &ChatRequest) -> Result<ChatResponse, AppError> {
            sleep(Duration::from_secs(5)).await;
            Ok(ChatResponse {
                content: "late".to_owned(),
                model: "slow".to_owned(),
                usage: None,
                finish_reason: None,
            })
        }
    }

    /// Remembers the last request it was sent
    struct RecordingProvider {
        capabilities: LlmCapabilities,
        seen: Mutex<Option<ChatRequest>>,
    }

    impl RecordingProvider {
        fn new(capabilities: LlmCapabilities) -> Self {
            Self {
                capabilities,
                seen: Mutex::new(None),
            }
        }

        fn last_request(&self) -> ChatRequest {
            self.seen.lock().unwrap().clone().unwrap()
        }
    }

    #[async_trait]
    impl LlmProvider for RecordingProvider {
        fn name(&self) -> &'static str {
            "recording"
        }
        fn display_name(&self) -> &'static str {
            "Recording"
        }
        fn capabilities(&self) -> LlmCapabilities {
            self.capabilities
        }
        fn default_model(&self) -> &str {
            "recording"
        }
        async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
            *self.seen.lock().unwrap() = Some(request.clone());
            Ok(ChatResponse {
                content: "{\"bmr\": 1500}".to_owned(),
                model: "recording".to_owned(),
                usage: None,
                finish_reason: Some("stop".to_owned()),
            })
        }
    }

    #[tokio::test]
    async fn test_structured_steps_use_hosted_capabilities() {
        let invoker = MonitoredInvoker::new(
            RecordingProvider::new(LlmCapabilities::hosted()),
            Duration::from_secs(1),
        );

        invoker.invoke("Анализ", 4000, "analysis").await.unwrap();
        let request = invoker.provider().last_request();
        assert!(request.json_mode);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, MessageRole::System);
        assert!(request.messages[0].content.contains("JSON"));
        assert_eq!(request.last_user_text(), "Анализ");
        assert_eq!(request.max_tokens, Some(4000));

        invoker.invoke("Здравей", 2000, CHAT_STEP).await.unwrap();
        let request = invoker.provider().last_request();
        assert!(!request.json_mode);
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, MessageRole::User);
    }

    #[tokio::test]
    async fn test_plain_backend_gets_a_single_user_message() {
        let invoker = MonitoredInvoker::new(
            RecordingProvider::new(LlmCapabilities::empty()),
            Duration::from_secs(1),
        )
        .with_model(Some("custom-model".to_owned()));

        invoker.invoke("План", 8000, "plan_correction").await.unwrap();
        let request = invoker.provider().last_request();
        assert!(!request.json_mode);
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.model.as_deref(), Some("custom-model"));
    }

    #[tokio::test]
    async fn test_timeout_is_a_failure() {
        let invoker = MonitoredInvoker::new(SlowProvider, Duration::from_millis(20));
        let err = invoker.invoke("здравей", 100, CHAT_STEP).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ModelTimeout);
    }

    #[tokio::test]
    async fn test_mock_reply_passes_through() {
        let invoker = MonitoredInvoker::new(MockProvider::new(), Duration::from_secs(1));
        let reply = invoker.invoke("въпрос", 100, CHAT_STEP).await.unwrap();
        assert!(!reply.is_empty());
    }
}

// ABOUTME: Unified LLM provider selector built from the loaded configuration
// ABOUTME: Wraps OpenAI, Groq, Gemini, or the mock provider behind one LlmProvider value
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

//! # Chat Provider Selection
//!
//! The backend is chosen once at startup from [`LlmSettings`]. A hosted
//! backend whose API key is missing falls back to the mock provider with a
//! warning, so a development checkout always runs.

use std::env;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{
    ChatRequest, ChatResponse, GeminiProvider, LlmCapabilities, LlmProvider, MockProvider,
    OpenAiCompatibleConfig, OpenAiCompatibleProvider,
};
use crate::config::{LlmProviderType, LlmSettings};
use crate::errors::AppError;

/// Unified chat provider
#[derive(Debug)]
pub enum ChatProvider {
    /// `OpenAI` chat completions
    OpenAi(OpenAiCompatibleProvider),
    /// Groq `OpenAI`-compatible endpoint
    Groq(OpenAiCompatibleProvider),
    /// Google Gemini
    Gemini(GeminiProvider),
    /// Offline canned replies
    Mock(MockProvider),
}

impl ChatProvider {
    /// Create the provider named by `settings`, reading API keys from the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client for a hosted provider cannot be created.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self, AppError> {
        let api_key = settings
            .provider
            .api_key_env_var()
            .and_then(|var| env::var(var).ok())
            .filter(|key| !key.trim().is_empty());

        let provider = match (settings.provider, api_key) {
            (LlmProviderType::Mock, _) => Self::Mock(MockProvider::new()),
            (provider_type, None) => {
                warn!(
                    "{} selected but {} is not set, using mock provider",
                    provider_type,
                    provider_type.api_key_env_var().unwrap_or("API key")
                );
                Self::Mock(MockProvider::new())
            }
            (LlmProviderType::OpenAi, Some(key)) => Self::OpenAi(OpenAiCompatibleProvider::new(
                OpenAiCompatibleConfig::openai(key, settings.model.clone()),
            )?),
            (LlmProviderType::Groq, Some(key)) => Self::Groq(OpenAiCompatibleProvider::new(
                OpenAiCompatibleConfig::groq(key, settings.model.clone()),
            )?),
            (LlmProviderType::Gemini, Some(key)) => {
                let provider = GeminiProvider::new(key);
                Self::Gemini(match settings.model.clone() {
                    Some(model) => provider.with_default_model(model),
                    None => provider,
                })
            }
        };

        info!(
            offline = provider.capabilities().is_offline(),
            "LLM provider initialized: {} (model {})",
            provider.display_name(),
            provider.default_model()
        );
        Ok(provider)
    }

    /// Get the provider type
    #[must_use]
    pub const fn provider_type(&self) -> LlmProviderType {
        match self {
            Self::OpenAi(_) => LlmProviderType::OpenAi,
            Self::Groq(_) => LlmProviderType::Groq,
            Self::Gemini(_) => LlmProviderType::Gemini,
            Self::Mock(_) => LlmProviderType::Mock,
        }
    }

    fn inner(&self) -> &dyn LlmProvider {
        match self {
            Self::OpenAi(provider) | Self::Groq(provider) => provider,
            Self::Gemini(provider) => provider,
            Self::Mock(provider) => provider,
        }
    }
}

#[async_trait]
impl LlmProvider for ChatProvider {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn display_name(&self) -> &'static str {
        self.inner().display_name()
    }

    fn capabilities(&self) -> LlmCapabilities {
        self.inner().capabilities()
    }

    fn default_model(&self) -> &str {
        self.inner().default_model()
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        self.inner().complete(request).await
    }
}

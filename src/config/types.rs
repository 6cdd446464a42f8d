// ABOUTME: Configuration type definitions for environment-driven settings
// ABOUTME: Contains the LlmProviderType enum and its environment variable contract
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// Text generation backend selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderType {
    /// `OpenAI` chat completions
    OpenAi,
    /// Google Gemini generateContent
    Gemini,
    /// Groq `OpenAI`-compatible endpoint
    Groq,
    /// Deterministic canned replies for development without API keys (default)
    #[default]
    Mock,
}

impl LlmProviderType {
    /// Environment variable name for provider selection
    pub const ENV_VAR: &'static str = "AIDIET_LLM_PROVIDER";

    /// Environment variable for model selection
    pub const MODEL_ENV_VAR: &'static str = "AIDIET_LLM_MODEL";

    /// Parse from string with fallback to default
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "openai" | "gpt" => Self::OpenAi,
            "gemini" | "google" => Self::Gemini,
            "groq" => Self::Groq,
            _ => Self::Mock, // Default fallback (including "mock")
        }
    }

    /// API key environment variable for this backend, if it needs one
    #[must_use]
    pub const fn api_key_env_var(&self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Gemini => Some("GEMINI_API_KEY"),
            Self::Groq => Some("GROQ_API_KEY"),
            Self::Mock => None,
        }
    }

    /// Load from environment variable
    ///
    /// When the selector is unset, the first backend whose API key is present
    /// wins; with no keys at all the mock backend is used.
    #[must_use]
    pub fn from_env() -> Self {
        if let Ok(value) = env::var(Self::ENV_VAR) {
            return Self::from_str_or_default(&value);
        }
        [Self::OpenAi, Self::Gemini, Self::Groq]
            .into_iter()
            .find(|provider| {
                provider
                    .api_key_env_var()
                    .and_then(|key| env::var(key).ok())
                    .is_some_and(|value| !value.is_empty())
            })
            .unwrap_or_default()
    }

    /// Get model override from environment
    #[must_use]
    pub fn model_from_env() -> Option<String> {
        env::var(Self::MODEL_ENV_VAR)
            .ok()
            .filter(|model| !model.trim().is_empty())
    }
}

impl Display for LlmProviderType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Gemini => write!(f, "gemini"),
            Self::Groq => write!(f, "groq"),
            Self::Mock => write!(f, "mock"),
        }
    }
}

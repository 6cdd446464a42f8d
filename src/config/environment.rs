// ABOUTME: Environment-based server configuration for the diet assistant
// ABOUTME: Reads provider, timeout, and token budget settings with logged fallbacks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use aidiet_core::constants::budgets;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::types::LlmProviderType;
use crate::errors::{AppError, AppResult};

/// Text generation backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Selected backend
    pub provider: LlmProviderType,
    /// Model override, provider default when absent
    pub model: Option<String>,
    /// Deadline for a single invocation in seconds
    pub timeout_secs: u64,
}

impl LlmSettings {
    /// Per-invocation deadline
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProviderType::default(),
            model: None,
            timeout_secs: budgets::DEFAULT_MODEL_TIMEOUT_SECS,
        }
    }
}

/// Token budgets and output caps for every model call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationBudgets {
    /// Estimated tokens kept in the windowed conversation history
    pub history_tokens: usize,
    /// Output cap for a chat reply
    pub chat_max_tokens: u32,
    /// Output cap for the analysis and strategy stages
    pub stage_max_tokens: u32,
    /// Output cap for the plan stage and the fallback
    pub plan_max_tokens: u32,
    /// Correction prompts sent for a plan that fails validation; 0 disables them
    pub correction_attempts: u32,
    /// Output cap for one correction reply
    pub correction_max_tokens: u32,
}

impl Default for GenerationBudgets {
    fn default() -> Self {
        Self {
            history_tokens: budgets::HISTORY_TOKEN_BUDGET,
            chat_max_tokens: budgets::CHAT_MAX_TOKENS,
            stage_max_tokens: budgets::STAGE_MAX_TOKENS,
            plan_max_tokens: budgets::PLAN_MAX_TOKENS,
            correction_attempts: budgets::MAX_CORRECTION_ATTEMPTS,
            correction_max_tokens: budgets::CORRECTION_MAX_TOKENS,
        }
    }
}

/// Server configuration loaded once at startup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Backend settings
    pub llm: LlmSettings,
    /// Token budgets
    pub budgets: GenerationBudgets,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a budget or timeout resolves to zero
    pub fn from_env() -> AppResult<Self> {
        info!("Loading configuration from environment variables");

        let config = Self {
            llm: LlmSettings {
                provider: LlmProviderType::from_env(),
                model: LlmProviderType::model_from_env(),
                timeout_secs: env_parse_or(
                    "AIDIET_LLM_TIMEOUT_SECS",
                    budgets::DEFAULT_MODEL_TIMEOUT_SECS,
                ),
            },
            budgets: GenerationBudgets {
                history_tokens: env_parse_or(
                    "AIDIET_HISTORY_TOKEN_BUDGET",
                    budgets::HISTORY_TOKEN_BUDGET,
                ),
                chat_max_tokens: env_parse_or("AIDIET_CHAT_MAX_TOKENS", budgets::CHAT_MAX_TOKENS),
                stage_max_tokens: env_parse_or(
                    "AIDIET_STAGE_MAX_TOKENS",
                    budgets::STAGE_MAX_TOKENS,
                ),
                plan_max_tokens: env_parse_or("AIDIET_PLAN_MAX_TOKENS", budgets::PLAN_MAX_TOKENS),
                correction_attempts: env_parse_or(
                    "AIDIET_MAX_CORRECTION_ATTEMPTS",
                    budgets::MAX_CORRECTION_ATTEMPTS,
                ),
                correction_max_tokens: env_parse_or(
                    "AIDIET_CORRECTION_MAX_TOKENS",
                    budgets::CORRECTION_MAX_TOKENS,
                ),
            },
        };

        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first zero-valued setting
    pub fn validate(&self) -> AppResult<()> {
        if self.llm.timeout_secs == 0 {
            return Err(AppError::config("AIDIET_LLM_TIMEOUT_SECS must be positive"));
        }
        if self.budgets.chat_max_tokens == 0
            || self.budgets.stage_max_tokens == 0
            || self.budgets.plan_max_tokens == 0
            || self.budgets.correction_max_tokens == 0
        {
            return Err(AppError::config("Model output caps must be positive"));
        }
        if self.budgets.history_tokens == 0 {
            warn!("History token budget is zero, conversation history will always be empty");
        }
        Ok(())
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "AI Diet Assistant Configuration:\n\
             - LLM Provider: {}\n\
             - LLM Model: {}\n\
             - Invocation Timeout: {}s\n\
             - History Budget: {} tokens\n\
             - Output Caps: chat={} stage={} plan={} correction={}\n\
             - Correction Attempts: {}",
            self.llm.provider,
            self.llm.model.as_deref().unwrap_or("provider default"),
            self.llm.timeout_secs,
            self.budgets.history_tokens,
            self.budgets.chat_max_tokens,
            self.budgets.stage_max_tokens,
            self.budgets.plan_max_tokens,
            self.budgets.correction_max_tokens,
            self.budgets.correction_attempts,
        )
    }
}

/// Parse an environment variable, falling back to `default` with a warning
fn env_parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid {key} value '{raw}', using default {default}");
            default
        }),
        Err(_) => default,
    }
}

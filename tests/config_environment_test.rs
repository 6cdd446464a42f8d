// ABOUTME: Tests for environment-driven server configuration
// ABOUTME: Validates provider selection, budget overrides, invalid values, and validation errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::env;
use std::time::Duration;

use aidiet_server::config::{GenerationBudgets, LlmProviderType, ServerConfig};
use aidiet_server::errors::ErrorCode;
use serial_test::serial;

const MANAGED_VARS: &[&str] = &[
    "AIDIET_LLM_PROVIDER",
    "AIDIET_LLM_MODEL",
    "AIDIET_LLM_TIMEOUT_SECS",
    "AIDIET_HISTORY_TOKEN_BUDGET",
    "AIDIET_CHAT_MAX_TOKENS",
    "AIDIET_STAGE_MAX_TOKENS",
    "AIDIET_PLAN_MAX_TOKENS",
    "AIDIET_MAX_CORRECTION_ATTEMPTS",
    "AIDIET_CORRECTION_MAX_TOKENS",
    "OPENAI_API_KEY",
    "GEMINI_API_KEY",
    "GROQ_API_KEY",
];

fn clear_env() {
    for var in MANAGED_VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_defaults_without_environment() {
    clear_env();
    let config = ServerConfig::from_env().unwrap();

    assert_eq!(config.llm.provider, LlmProviderType::Mock);
    assert!(config.llm.model.is_none());
    assert_eq!(config.llm.timeout(), Duration::from_secs(90));
    assert_eq!(config.budgets, GenerationBudgets::default());
    assert_eq!(config.budgets.history_tokens, 2000);
}

#[test]
#[serial]
fn test_overrides_from_environment() {
    clear_env();
    env::set_var("AIDIET_LLM_PROVIDER", "Gemini");
    env::set_var("AIDIET_LLM_MODEL", "gemini-2.0-flash");
    env::set_var("AIDIET_LLM_TIMEOUT_SECS", "30");
    env::set_var("AIDIET_HISTORY_TOKEN_BUDGET", "500");
    env::set_var("AIDIET_PLAN_MAX_TOKENS", " 6000 ");
    env::set_var("AIDIET_MAX_CORRECTION_ATTEMPTS", "0");
    env::set_var("AIDIET_CORRECTION_MAX_TOKENS", "3000");

    let config = ServerConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.llm.provider, LlmProviderType::Gemini);
    assert_eq!(config.llm.model.as_deref(), Some("gemini-2.0-flash"));
    assert_eq!(config.llm.timeout_secs, 30);
    assert_eq!(config.budgets.history_tokens, 500);
    assert_eq!(config.budgets.plan_max_tokens, 6000);
    assert_eq!(config.budgets.chat_max_tokens, 2000);
    assert_eq!(config.budgets.correction_attempts, 0);
    assert_eq!(config.budgets.correction_max_tokens, 3000);
}

#[test]
#[serial]
fn test_provider_inferred_from_api_key() {
    clear_env();
    env::set_var("GROQ_API_KEY", "gsk-test");
    let provider = LlmProviderType::from_env();
    clear_env();

    assert_eq!(provider, LlmProviderType::Groq);
}

#[test]
#[serial]
fn test_unparseable_value_falls_back_to_default() {
    clear_env();
    env::set_var("AIDIET_CHAT_MAX_TOKENS", "lots");
    let config = ServerConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.budgets.chat_max_tokens, 2000);
}

#[test]
#[serial]
fn test_zero_timeout_is_a_config_error() {
    clear_env();
    env::set_var("AIDIET_LLM_TIMEOUT_SECS", "0");
    let err = ServerConfig::from_env().unwrap_err();
    clear_env();

    assert_eq!(err.code, ErrorCode::ConfigError);
}

#[test]
#[serial]
fn test_summary_lists_provider_and_budgets() {
    clear_env();
    let summary = ServerConfig::from_env().unwrap().summary();

    assert!(summary.contains("LLM Provider: mock"));
    assert!(summary.contains("History Budget: 2000 tokens"));
    assert!(!summary.contains("API_KEY"));
}

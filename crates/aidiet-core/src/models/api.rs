// ABOUTME: Structured request and response bodies exchanged with the request router
// ABOUTME: Field names follow the camelCase contract the web client already speaks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{ChatMode, ExchangeTurn, PlanResult, UserProfile};

/// Chat request as supplied by the router
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequestBody {
    /// Client message
    #[serde(default)]
    pub message: Option<String>,
    /// Current profile
    #[serde(default)]
    pub user_data: Option<UserProfile>,
    /// Current plan
    #[serde(default)]
    pub user_plan: Option<PlanResult>,
    /// Conversation mode; absent, empty or unknown labels mean consultation
    #[serde(default, deserialize_with = "lenient_mode")]
    pub mode: Option<ChatMode>,
    /// Prior exchange log; `null` is treated as empty
    #[serde(default, deserialize_with = "null_as_empty")]
    pub conversation_history: Vec<ExchangeTurn>,
}

fn lenient_mode<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<ChatMode>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(Value::as_str)
        .map(ChatMode::from_str_or_default))
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Chat response handed back to the router
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponseBody {
    /// Always `true`; failures are reported through the error body instead
    pub success: bool,
    /// Cleaned assistant reply
    pub response: String,
    /// Windowed exchange log including this turn
    pub conversation_history: Vec<ExchangeTurn>,
    /// Whether a new plan was generated
    pub plan_updated: bool,
    /// Regenerated plan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_plan: Option<PlanResult>,
    /// Merged profile that produced `updated_plan`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_user_data: Option<UserProfile>,
    /// Why a requested regeneration did not happen
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_error: Option<String>,
}

/// Plan generation response handed back to the router
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponseBody {
    /// Always `true`; failures are reported through the error body instead
    pub success: bool,
    /// Stable identifier derived from the profile
    pub user_id: String,
    /// Generated plan, absent when a contradiction was reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanResult>,
    /// Whether the goal conflicts with the profile
    #[serde(default)]
    pub has_contradiction: bool,
    /// Contradiction details for the client warning dialog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_data: Option<Value>,
}

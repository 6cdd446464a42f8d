// ABOUTME: Google Gemini provider speaking the generateContent REST API
// ABOUTME: Lifts the system prompt into systemInstruction and rejects filtered candidates
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

//! # Gemini Provider
//!
//! Non-streaming `generateContent` client. A candidate that stopped for any
//! reason other than `STOP` (safety filter, recitation, token cap) fails the
//! invocation, since its text may be cut short.

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::http_failure::{status_failure, transport_failure};
use super::{ChatRequest, ChatResponse, LlmCapabilities, LlmProvider, MessageRole, TokenUsage};
use crate::errors::AppError;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_DEFAULT_MODEL: &str = "gemini-2.5-flash";
const SERVICE: &str = "Google Gemini";

/// Finish reason of a complete candidate
const COMPLETE: &str = "STOP";

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody<'a> {
    contents: Vec<Turn<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Turn<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<Sampling>,
}

#[derive(Debug, Serialize)]
struct Turn<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: [TextPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Sampling {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    candidate_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateReply {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageCounts>,
    error: Option<ReplyError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Debug, Deserialize)]
struct ReplyPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UsageCounts {
    prompt_token_count: u32,
    candidates_token_count: u32,
    total_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct ReplyError {
    message: String,
}

fn turn<'a>(role: Option<&'static str>, text: &'a str) -> Turn<'a> {
    Turn {
        role,
        parts: [TextPart { text }],
    }
}

/// Gemini has no system role; assistant turns are authored by `model`
fn encode_request(request: &ChatRequest) -> GenerateBody<'_> {
    let sampled =
        request.temperature.is_some() || request.max_tokens.is_some() || request.json_mode;
    let mut body = GenerateBody {
        contents: Vec::with_capacity(request.messages.len()),
        system_instruction: None,
        generation_config: sampled.then_some(Sampling {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
            response_mime_type: request.json_mode.then_some("application/json"),
            candidate_count: 1,
        }),
    };
    for message in &request.messages {
        match message.role {
            MessageRole::System => body.system_instruction = Some(turn(None, &message.content)),
            MessageRole::User => body.contents.push(turn(Some("user"), &message.content)),
            MessageRole::Assistant => body.contents.push(turn(Some("model"), &message.content)),
        }
    }
    body
}

/// Joined text of the first candidate
fn candidate_text(reply: GenerateReply) -> Result<String, AppError> {
    let candidate = reply
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AppError::malformed_output("gemini", "no candidates in response"))?;

    if let Some(reason) = candidate
        .finish_reason
        .as_deref()
        .filter(|reason| *reason != COMPLETE)
    {
        warn!(finish_reason = reason, "Gemini candidate stopped early");
        let why = match reason {
            "SAFETY" => "response blocked by the safety filter".to_owned(),
            "RECITATION" => "response blocked for potential recitation".to_owned(),
            "MAX_TOKENS" => "response hit the output token limit".to_owned(),
            other => format!("candidate finished with {other}"),
        };
        return Err(AppError::malformed_output("gemini", why));
    }

    let text: String = candidate
        .content
        .map(|content| content.parts.into_iter().map(|part| part.text).collect())
        .unwrap_or_default();
    if text.is_empty() {
        return Err(AppError::malformed_output("gemini", "empty candidate content"));
    }
    Ok(text)
}

// ============================================================================
// Provider
// ============================================================================

/// Google Gemini backend
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    default_model: String,
}

impl GeminiProvider {
    /// Provider using `gemini-2.5-flash`
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            default_model: GEMINI_DEFAULT_MODEL.to_owned(),
        }
    }

    /// Replace the model used when a request names none
    #[must_use]
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }
}

impl fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_key", &"[REDACTED]")
            .field("default_model", &self.default_model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn display_name(&self) -> &'static str {
        SERVICE
    }

    fn capabilities(&self) -> LlmCapabilities {
        LlmCapabilities::hosted()
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    #[instrument(skip_all, fields(provider = "gemini"))]
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        let model = request.model.as_deref().unwrap_or(&self.default_model);
        let response = self
            .client
            .post(format!("{GEMINI_BASE_URL}/models/{model}:generateContent"))
            .query(&[("key", self.api_key.as_str())])
            .json(&encode_request(request))
            .send()
            .await
            .map_err(|e| transport_failure(SERVICE, &e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            AppError::external_service(SERVICE, format!("Failed to read response: {e}"))
        })?;
        let parsed = serde_json::from_str::<GenerateReply>(&text);

        if !status.is_success() {
            let detail = match parsed {
                Ok(GenerateReply {
                    error: Some(error), ..
                }) => error.message,
                _ => text,
            };
            return Err(status_failure(SERVICE, status, &detail));
        }

        let mut reply = parsed.map_err(|e| {
            AppError::external_service(SERVICE, format!("Failed to parse response: {e}"))
        })?;
        if let Some(error) = reply.error.take() {
            return Err(AppError::external_service(
                SERVICE,
                format!("API error: {}", error.message),
            ));
        }

        let usage = reply.usage_metadata.take().map(|counts| TokenUsage {
            prompt_tokens: counts.prompt_token_count,
            completion_tokens: counts.candidates_token_count,
            total_tokens: counts.total_token_count,
        });
        let content = candidate_text(reply)?;
        debug!(chars = content.len(), "Gemini candidate received");

        Ok(ChatResponse {
            content,
            model: model.to_owned(),
            usage,
            finish_reason: Some(COMPLETE.to_owned()),
        })
    }
}

// ABOUTME: Exchange log turn and chat mode types
// ABOUTME: The log is chronological and only ever read or trimmed as a copy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

use std::fmt;

use serde::{Deserialize, Serialize};

/// Author of an exchange turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeRole {
    /// Client message
    User,
    /// Assistant reply
    Assistant,
}

impl ExchangeRole {
    /// Lowercase label used in prompts
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One turn of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeTurn {
    /// Who wrote the turn
    pub role: ExchangeRole,
    /// Turn text
    pub content: String,
}

impl ExchangeTurn {
    /// Create a user turn
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ExchangeRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant turn
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ExchangeRole::Assistant,
            content: content.into(),
        }
    }
}

/// Conversation mode selected by the client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    /// Read-only questions about the current plan
    #[default]
    Consultation,
    /// Plan changes are allowed and trigger regeneration
    Modification,
}

impl ChatMode {
    /// Parse a mode label, defaulting to consultation for anything unknown
    #[must_use]
    pub fn from_str_or_default(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "modification" => Self::Modification,
            _ => Self::Consultation,
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Consultation => write!(f, "consultation"),
            Self::Modification => write!(f, "modification"),
        }
    }
}

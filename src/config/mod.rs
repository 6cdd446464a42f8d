// ABOUTME: Configuration management module for runtime settings
// ABOUTME: Handles environment-driven provider selection, timeouts, and token budgets
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors
//! Configuration module for the diet assistant
//!
//! - **Types**: Strongly typed enums parsed from environment strings
//! - **Environment**: Server configuration assembled from environment variables

/// Environment and server configuration
pub mod environment;
/// Strongly typed configuration enums
pub mod types;

pub use environment::{GenerationBudgets, LlmSettings, ServerConfig};
pub use types::LlmProviderType;

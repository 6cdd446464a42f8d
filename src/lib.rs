// ABOUTME: Main library entry point for the AI diet assistant core
// ABOUTME: Multi-stage meal plan generation and directive-driven chat orchestration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

#![deny(unsafe_code)]

//! # `AIDiet` Server
//!
//! Turns free-form text from a generative model into reliable structured
//! state for an AI diet assistant.
//!
//! ## Features
//!
//! - **Stage pipeline**: Analysis, Strategy and Plan invocations chained on
//!   each other's output, with a single-shot fallback
//! - **Directive scanner**: extracts `[REGENERATE_PLAN:{...}]` payloads from
//!   chat replies despite nested brackets and quoted text
//! - **Preference merger**: idempotent folding of requested modifications
//!   into the client profile
//! - **History windowing**: keeps the newest conversation turns that fit a
//!   token budget
//!
//! ## Architecture
//!
//! - **Chat**: pure per-turn primitives (scanner, merger, windower)
//! - **Pipeline**: the stage state machine
//! - **Services**: chat orchestration and plan generation entry points
//! - **LLM**: providers and the `ModelInvoker` seam the core depends on
//! - **Prompts**: compiled-in templates with injected overrides
//! - **Config**: environment-driven provider and budget settings
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use aidiet_server::config::ServerConfig;
//! use aidiet_server::errors::AppResult;
//! use aidiet_server::llm::{ChatProvider, MonitoredInvoker};
//! use aidiet_server::prompts::NoOverrides;
//! use aidiet_server::services::ChatOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     let provider = ChatProvider::from_settings(&config.llm)?;
//!     let invoker = MonitoredInvoker::new(provider, config.llm.timeout());
//!     let orchestrator = ChatOrchestrator::new(&invoker, &NoOverrides, config.budgets);
//!
//!     let request = serde_json::from_str(r#"{"message": "Здравей", "userData": {}, "userPlan": {}}"#)?;
//!     let response = orchestrator.handle(request).await?;
//!     println!("{}", response.response);
//!     Ok(())
//! }
//! ```

/// Per-turn chat primitives: directive scanning, preference merging, history windowing
pub mod chat;

/// Environment-driven configuration
pub mod config;

/// Unified error handling re-exported from `aidiet-core`
pub mod errors;

/// Deterministic calculations: token estimates and nutrition formulas
pub mod intelligence;

/// Text generation providers and the model invocation seam
pub mod llm;

/// Structured logging configuration and domain log events
pub mod logging;

/// Analysis, Strategy, Plan stage pipeline with single-shot fallback
pub mod pipeline;

/// Prompt templates and construction
pub mod prompts;

/// Chat orchestration and plan generation services
pub mod services;

pub use aidiet_core::constants;
pub use aidiet_core::models;

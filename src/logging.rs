// ABOUTME: Tracing subscriber setup plus the shared event vocabulary for diet generation
// ABOUTME: Reads RUST_LOG and LOG_FORMAT, writes to stderr, and names model, stage, and directive fields
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

//! Structured logging
//!
//! Model invocations, pipeline stage transitions and directive handling are
//! all reported through [`AppLogger`] so every event carries the same field
//! names regardless of which layer emitted it. Logs always go to stderr;
//! stdout belongs to the CLI's JSON output.

use std::env;
use std::io;

use anyhow::{anyhow, Result};
use serde_json::json;
use tracing::{info, warn, Level};
use tracing_subscriber::{
    filter::Directive,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const SERVICE_NAME: &str = "aidiet-server";
const DEFAULT_LEVEL: &str = "info";
const DEFAULT_ENVIRONMENT: &str = "development";

/// Subscriber settings
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directive for this crate (`info`, `debug`, ...)
    pub level: String,
    /// Line format
    pub format: LogFormat,
    /// Print file and line of each event
    pub include_location: bool,
    /// Emit span enter and exit events
    pub include_spans: bool,
    /// Reported in the startup event
    pub service_name: String,
    /// Reported in the startup event
    pub service_version: String,
    /// Deployment label; `production` turns on location and spans
    pub environment: String,
}

/// Line format of the fmt layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event
    Json,
    /// Multi-field human readable lines
    Pretty,
    /// Single short line per event
    Compact,
}

impl LogFormat {
    /// Parse a `LOG_FORMAT` value; anything unknown is pretty
    #[must_use]
    pub fn from_str_or_default(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL.to_owned(),
            format: LogFormat::Pretty,
            include_location: false,
            include_spans: false,
            service_name: SERVICE_NAME.to_owned(),
            service_version: env!("CARGO_PKG_VERSION").to_owned(),
            environment: DEFAULT_ENVIRONMENT.to_owned(),
        }
    }
}

impl LoggingConfig {
    /// Read `RUST_LOG`, `LOG_FORMAT`, `ENVIRONMENT` and the `LOG_INCLUDE_*` switches
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let environment = env::var("ENVIRONMENT").unwrap_or(defaults.environment);
        let verbose = environment == "production";

        Self {
            level: env::var("RUST_LOG").unwrap_or(defaults.level),
            format: env::var("LOG_FORMAT")
                .map_or(defaults.format, |value| LogFormat::from_str_or_default(&value)),
            include_location: verbose || env::var("LOG_INCLUDE_LOCATION").is_ok(),
            include_spans: verbose || env::var("LOG_INCLUDE_SPANS").is_ok(),
            service_name: env::var("SERVICE_NAME").unwrap_or(defaults.service_name),
            service_version: defaults.service_version,
            environment,
        }
    }

    /// HTTP client crates stay at warn whatever `RUST_LOG` asks for
    fn env_filter(&self) -> EnvFilter {
        let directive = |text: String, fallback: Level| -> Directive {
            text.parse().unwrap_or_else(|_| fallback.into())
        };
        EnvFilter::new(&self.level)
            .add_directive(directive("hyper=warn".to_owned(), Level::WARN))
            .add_directive(directive("reqwest=warn".to_owned(), Level::WARN))
            .add_directive(directive(format!("aidiet_server={}", self.level), Level::INFO))
    }

    fn span_events(&self) -> FmtSpan {
        if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    /// Install the global subscriber and log the active settings
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber is already installed
    pub fn init(&self) -> Result<()> {
        let registry = tracing_subscriber::registry().with(self.env_filter());
        let layer = fmt::layer()
            .with_writer(io::stderr)
            .with_file(self.include_location)
            .with_line_number(self.include_location)
            .with_span_events(self.span_events());

        match self.format {
            LogFormat::Json => registry.with(layer.json()).try_init(),
            LogFormat::Pretty => registry.with(layer).try_init(),
            LogFormat::Compact => registry.with(layer.compact().with_target(false)).try_init(),
        }
        .map_err(|e| anyhow!("Tracing subscriber already installed: {e}"))?;

        info!(
            service.name = %self.service_name,
            service.version = %self.service_version,
            environment = %self.environment,
            settings = %json!({
                "level": self.level,
                "format": format!("{:?}", self.format),
                "location": self.include_location,
                "spans": self.include_spans,
            }),
            "Logging initialized"
        );
        Ok(())
    }
}

/// Event helpers shared by the invoker, pipeline, history and chat layers
pub struct AppLogger;

impl AppLogger {
    /// One call to the text generation backend
    pub fn log_model_invocation(
        step: &str,
        input_tokens: usize,
        max_tokens: Option<u32>,
        duration_ms: u64,
        success: bool,
    ) {
        info!(
            model.step = %step,
            model.input_tokens = input_tokens,
            model.max_tokens = ?max_tokens,
            model.duration_ms = duration_ms,
            model.success = success,
            "Model invocation"
        );
    }

    /// Pipeline moved from one stage to the next
    pub fn log_stage_transition(from: &str, to: &str, cumulative_tokens: usize) {
        info!(
            pipeline.from = %from,
            pipeline.to = %to,
            pipeline.cumulative_tokens = cumulative_tokens,
            "Pipeline stage transition"
        );
    }

    /// Stage failed and the single-shot fallback takes over
    pub fn log_stage_failure(stage: &str, reason: &str) {
        warn!(
            pipeline.stage = %stage,
            pipeline.reason = %reason,
            "Pipeline stage failed, switching to single-shot fallback"
        );
    }

    /// Directive found, stripped or acted on in a chat reply
    pub fn log_directive_event(event: &str, mode: &str, modifications: usize) {
        info!(
            directive.event = %event,
            chat.mode = %mode,
            directive.modifications = modifications,
            "Embedded directive"
        );
    }

    /// Result of trimming chat history to its budget
    pub fn log_history_window(input_turns: usize, kept_turns: usize, total_tokens: usize) {
        info!(
            history.input_turns = input_turns,
            history.kept_turns = kept_turns,
            history.total_tokens = total_tokens,
            "Conversation history windowed"
        );
    }
}

// ABOUTME: AI diet assistant CLI - runs chat turns and plan generation against the configured model
// ABOUTME: Reads request JSON from files, prints response JSON, and exposes token estimation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors
//!
//! Usage:
//! ```bash
//! # Run one chat turn (body shaped like the /api/chat request)
//! aidiet-cli chat --request request.json
//!
//! # Generate a first plan from a questionnaire profile
//! aidiet-cli generate --profile profile.json
//!
//! # Estimate the token cost of a piece of text
//! aidiet-cli estimate-tokens "Здравей, как си?"
//!
//! # Show the effective configuration
//! aidiet-cli config
//! ```
//!
//! Logs go to stderr so stdout stays valid JSON.

use std::fs;
use std::path::{Path, PathBuf};

use aidiet_server::config::ServerConfig;
use aidiet_server::errors::{AppError, AppResult};
use aidiet_server::intelligence::estimate_tokens;
use aidiet_server::llm::{ChatProvider, MonitoredInvoker};
use aidiet_server::logging::LoggingConfig;
use aidiet_server::models::{ChatRequestBody, UserProfile};
use aidiet_server::prompts::NoOverrides;
use aidiet_server::services::{ChatOrchestrator, PlanGenerationService};
use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "aidiet-cli",
    about = "AI Diet Assistant CLI",
    long_about = "Command-line front end for the diet assistant: chat turns, plan generation, and token estimates."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[non_exhaustive]
#[derive(Subcommand)]
enum Command {
    /// Run one chat turn from a request file
    Chat {
        /// Path to a JSON chat request body
        #[arg(long)]
        request: PathBuf,
    },

    /// Generate a meal plan from a profile file
    Generate {
        /// Path to a JSON questionnaire profile
        #[arg(long)]
        profile: PathBuf,
    },

    /// Estimate the token cost of text
    EstimateTokens {
        /// Text to measure
        text: String,
    },

    /// Print the configuration loaded from the environment
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env();
    if cli.verbose {
        "debug".clone_into(&mut logging.level);
    }
    logging.init()?;

    match cli.command {
        Command::EstimateTokens { text } => {
            print_json(&json!({
                "characters": text.chars().count(),
                "tokens": estimate_tokens(&text),
            }))?;
        }
        Command::Config => {
            let config = ServerConfig::from_env()?;
            println!("{}", config.summary());
        }
        Command::Chat { request } => {
            let body: ChatRequestBody = read_json(&request)?;
            let config = ServerConfig::from_env()?;
            let invoker = build_invoker(&config)?;
            let response = ChatOrchestrator::new(&invoker, &NoOverrides, config.budgets)
                .handle(body)
                .await?;
            info!(plan_updated = response.plan_updated, "Chat turn completed");
            print_json(&response)?;
        }
        Command::Generate { profile } => {
            let profile: UserProfile = read_json(&profile)?;
            let config = ServerConfig::from_env()?;
            let invoker = build_invoker(&config)?;
            let response = PlanGenerationService::new(&invoker, &NoOverrides, config.budgets)
                .respond(&profile)
                .await?;
            print_json(&response)?;
        }
    }

    Ok(())
}

fn build_invoker(config: &ServerConfig) -> AppResult<MonitoredInvoker<ChatProvider>> {
    info!("{}", config.summary());
    let provider = ChatProvider::from_settings(&config.llm)?;
    Ok(MonitoredInvoker::new(provider, config.llm.timeout()).with_model(config.llm.model.clone()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> AppResult<T> {
    let raw = fs::read_to_string(path).map_err(|e| {
        AppError::invalid_input(format!("Cannot read {}: {e}", path.display())).with_source(e)
    })?;
    Ok(serde_json::from_str(&raw)?)
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

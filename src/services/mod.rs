// ABOUTME: Domain service layer exposing the two entry points the request router calls
// ABOUTME: Chat turn orchestration and first-plan generation over an injected model invoker
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

//! Domain service layer
//!
//! Services take structured request records and return structured response
//! records. They hold no state of their own: the model invoker, prompt
//! overrides and budgets are borrowed from the caller.

/// One chat turn: prompt, model call, directive handling, optional regeneration
pub mod chat_orchestration;

/// First plan for a questionnaire profile
pub mod plan_generation;

pub use chat_orchestration::{ChatOrchestrator, Regeneration};
pub use plan_generation::{derive_user_id, PlanGenerationOutcome, PlanGenerationService};

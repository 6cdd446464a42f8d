// ABOUTME: Core data models for the diet assistant conversation and plan flows
// ABOUTME: Re-exports profile, directive, exchange log, plan, and wire body types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

//! # Data Models
//!
//! Every record here is owned by the caller and passed by value into the
//! orchestration layer. Nothing in this module holds process-wide state.
//!
//! - `UserProfile`: questionnaire answers plus accumulated preferences
//! - `ModificationDirective`: a named flag or a parameterized food exclusion
//! - `ExchangeTurn`: one chat turn in a chronological exchange log
//! - `PlanResult`: the composite plan with its analysis and strategy
//! - `ChatRequestBody` / `ChatResponseBody`: structured router bodies

mod api;
mod conversation;
mod plan;
mod profile;

pub use api::{ChatRequestBody, ChatResponseBody, PlanResponseBody};
pub use conversation::{ChatMode, ExchangeRole, ExchangeTurn};
pub use plan::{GenerationMeta, PlanResult, StageTokenUsage};
pub use profile::{ModificationDirective, UserProfile};

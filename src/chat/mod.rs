// ABOUTME: Chat support primitives used by the orchestrator around each model reply
// ABOUTME: Directive scanning, preference merging, and conversation history windowing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

//! # Chat Module
//!
//! Pure building blocks for one chat turn. None of them call the model.

/// Embedded plan-regeneration directive scanner
pub mod directive;
/// Token-budget windowing of the exchange log
pub mod history;
/// Merging of requested modifications into the profile
pub mod preferences;

pub use directive::{
    find_payload_end, scan_reply, truncate_at_sentinel, DirectivePayload, DirectiveScan,
};
pub use history::{window_history, HistoryWindow};
pub use preferences::{merge_preferences, MergeOutcome};

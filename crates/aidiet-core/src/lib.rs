// ABOUTME: Core types and constants for the AI diet assistant
// ABOUTME: Foundation crate with error handling, domain constants, and the conversation/plan model
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

#![deny(unsafe_code)]

//! # `AIDiet` Core
//!
//! Foundation crate providing shared types and constants for the AI diet
//! assistant. This crate is designed to change infrequently, enabling
//! incremental compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError`, `ErrorCode`, and `AppResult`
//! - **constants**: Sentinel markers, token budgets, and fixed user-facing messages
//! - **models**: User profile, modification directives, exchange log, and plan records

/// Unified error handling system with standard error codes and HTTP-like statuses
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Core data models (profile, directives, conversation, plan, wire bodies)
pub mod models;

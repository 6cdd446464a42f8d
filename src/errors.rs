// ABOUTME: Re-export of the unified error system from the aidiet-core foundation crate
// ABOUTME: Keeps crate::errors paths stable for every module in the server crate
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

//! # Unified Error Handling System
//!
//! The types live in `aidiet-core` so that they change rarely and compile
//! once; this module re-exports them under the familiar `crate::errors` path.

pub use aidiet_core::errors::{AppError, AppResult, ErrorCode, ErrorResponse};

// ABOUTME: Maps transport errors and non-success HTTP statuses from hosted backends to AppError
// ABOUTME: Shared by the OpenAI-compatible and Gemini providers so both fail the same way
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

use reqwest::StatusCode;
use tracing::error;

use crate::errors::{AppError, ErrorCode};

/// Longest slice of an unparseable error body echoed into the message
const BODY_EXCERPT_CHARS: usize = 200;

/// Error for a request that never produced a response
pub(super) fn transport_failure(service: &'static str, e: &reqwest::Error) -> AppError {
    error!(service, error = %e, "Request to text generation backend failed");
    if e.is_timeout() {
        AppError::new(
            ErrorCode::ModelTimeout,
            format!("{service} did not answer in time"),
        )
    } else {
        AppError::external_service(service, format!("Failed to connect: {e}"))
    }
}

/// Error for a non-success status
///
/// `detail` is the backend's own error message when its body could be
/// decoded, otherwise the raw body.
pub(super) fn status_failure(service: &'static str, status: StatusCode, detail: &str) -> AppError {
    error!(service, status = %status, "Text generation backend returned an error");
    match status.as_u16() {
        401 | 403 => AppError::new(
            ErrorCode::ExternalAuthFailed,
            format!("{service} authentication failed: {detail}"),
        ),
        429 => AppError::new(ErrorCode::ExternalRateLimited, rate_limit_message(detail)),
        400 => AppError::invalid_input(format!("{service} rejected the request: {detail}")),
        502..=504 => AppError::new(
            ErrorCode::ExternalServiceUnavailable,
            format!("{service} is not responding ({status})"),
        ),
        _ => AppError::external_service(
            service,
            format!(
                "API error ({status}): {}",
                detail.chars().take(BODY_EXCERPT_CHARS).collect::<String>()
            ),
        ),
    }
}

/// Client-facing rate limit text, with the backend's wait hint when it gave one
fn rate_limit_message(detail: &str) -> String {
    retry_after_secs(detail).map_or_else(
        || "LLM rate limit reached. Please wait a moment and try again.".to_owned(),
        |seconds| format!("LLM rate limit reached. Please try again in {seconds} seconds."),
    )
}

/// Seconds from a "try again in 2.5s" style hint, rounded up
fn retry_after_secs(detail: &str) -> Option<u64> {
    const MARKER: &str = "try again in ";
    let lower = detail.to_lowercase();
    let after = &lower[lower.find(MARKER)? + MARKER.len()..];
    let digits: String = after
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let seconds: f64 = digits.parse().ok()?;
    Some(seconds.ceil() as u64)
}

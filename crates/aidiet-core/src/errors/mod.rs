// ABOUTME: Unified error type shared by every layer of the diet assistant
// ABOUTME: Maps error codes to HTTP-like statuses and renders caller-facing error bodies
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

//! # Unified Error Handling System
//!
//! Defines the standard error codes, the structured [`AppError`] type and the
//! response body rendered for callers. Model failures, malformed stage output
//! and terminal pipeline failures each carry their own code so the request
//! router can tell them apart without string matching.

use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Validation (3000-3999)
    /// The provided input is invalid
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 3000,
    /// A required request field is absent
    #[serde(rename = "MISSING_REQUIRED_FIELD")]
    MissingRequiredField = 3001,
    /// The data format is invalid
    #[serde(rename = "INVALID_FORMAT")]
    InvalidFormat = 3002,

    // External Services (5000-5999)
    /// The text-generation backend returned an error
    #[serde(rename = "EXTERNAL_SERVICE_ERROR")]
    ExternalServiceError = 5000,
    /// The text-generation backend is unreachable
    #[serde(rename = "EXTERNAL_SERVICE_UNAVAILABLE")]
    ExternalServiceUnavailable = 5001,
    /// Authentication with the backend failed
    #[serde(rename = "EXTERNAL_AUTH_FAILED")]
    ExternalAuthFailed = 5002,
    /// The backend rate limited the request
    #[serde(rename = "EXTERNAL_RATE_LIMITED")]
    ExternalRateLimited = 5003,
    /// A model invocation did not finish in time
    #[serde(rename = "MODEL_TIMEOUT")]
    ModelTimeout = 5004,

    // Generation (7000-7999)
    /// A model reply could not be parsed into structured data
    #[serde(rename = "MALFORMED_OUTPUT")]
    MalformedOutput = 7000,
    /// Both the staged pipeline and its fallback failed
    #[serde(rename = "PLAN_GENERATION_FAILED")]
    PlanGenerationFailed = 7001,
    /// The plan still failed its quality checks after every correction
    #[serde(rename = "PLAN_VALIDATION_FAILED")]
    PlanValidationFailed = 7002,

    // Configuration (6000-6999)
    /// Configuration error encountered
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError = 6000,
    /// Required configuration is missing
    #[serde(rename = "CONFIG_MISSING")]
    ConfigMissing = 6001,

    // Internal Errors (9000-9999)
    /// An internal error occurred
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
    /// Data serialization/deserialization failed
    #[serde(rename = "SERIALIZATION_ERROR")]
    SerializationError = 9003,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidInput
            | Self::MissingRequiredField
            | Self::InvalidFormat
            | Self::PlanValidationFailed => 400,
            Self::ExternalServiceError
            | Self::ExternalServiceUnavailable
            | Self::MalformedOutput
            | Self::PlanGenerationFailed => 502,
            Self::ExternalAuthFailed | Self::ExternalRateLimited => 503,
            Self::ModelTimeout => 504,
            Self::ConfigError
            | Self::ConfigMissing
            | Self::InternalError
            | Self::SerializationError => 500,
        }
    }

    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InvalidInput => "The provided input is invalid",
            Self::MissingRequiredField => "A required field is missing from the request",
            Self::InvalidFormat => "The data format is invalid",
            Self::ExternalServiceError => "The text generation service encountered an error",
            Self::ExternalServiceUnavailable => "The text generation service is unavailable",
            Self::ExternalAuthFailed => "Authentication with the text generation service failed",
            Self::ExternalRateLimited => "The text generation service rate limit was exceeded",
            Self::ModelTimeout => "The text generation service did not respond in time",
            Self::MalformedOutput => "The model reply could not be parsed",
            Self::PlanGenerationFailed => "The meal plan could not be generated",
            Self::PlanValidationFailed => "The meal plan did not pass its quality checks",
            Self::ConfigError => "Configuration error encountered",
            Self::ConfigMissing => "Required configuration is missing",
            Self::InternalError => "An internal error occurred",
            Self::SerializationError => "Data serialization/deserialization failed",
        }
    }

    /// Whether this code describes a failed model round-trip
    ///
    /// The stage pipeline treats every such failure identically: the staged
    /// attempt is abandoned and the single-shot fallback runs.
    #[must_use]
    pub const fn is_model_failure(&self) -> bool {
        matches!(
            self,
            Self::ExternalServiceError
                | Self::ExternalServiceUnavailable
                | Self::ExternalAuthFailed
                | Self::ExternalRateLimited
                | Self::ModelTimeout
                | Self::MalformedOutput
        )
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional key-value context
    pub details: Value,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Value::Object(Map::new()),
            source: None,
        }
    }

    /// Attach structured details
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Invalid input
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// A required field is missing
    #[must_use]
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("Missing required field: {field}"),
        )
        .with_details(serde_json::json!({ "field": field }))
    }

    /// Configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// External service error
    #[must_use]
    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExternalServiceError,
            format!("{}: {}", service.into(), message.into()),
        )
    }

    /// Model invocation exceeded its deadline
    #[must_use]
    pub fn model_timeout(step: &str, seconds: u64) -> Self {
        Self::new(
            ErrorCode::ModelTimeout,
            format!("Model invocation for {step} timed out after {seconds}s"),
        )
    }

    /// Model reply did not contain usable structured data
    #[must_use]
    pub fn malformed_output(step: &str, reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::MalformedOutput,
            format!("Malformed output from {step}: {}", reason.into()),
        )
    }

    /// Terminal pipeline failure
    #[must_use]
    pub fn plan_generation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PlanGenerationFailed, message)
    }

    /// Plan still invalid after the correction attempts and the simplified retry
    ///
    /// The individual problems are listed under `validationErrors`.
    #[must_use]
    pub fn plan_validation_failed(attempts: u32, errors: &[String]) -> Self {
        Self::new(
            ErrorCode::PlanValidationFailed,
            format!(
                "Планът не премина качествен тест след {attempts} опити за корекция: {}",
                errors.join("; ")
            ),
        )
        .with_details(serde_json::json!({
            "validationErrors": errors,
            "correctionAttempts": attempts,
        }))
    }

    /// Internal error
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(ErrorCode::SerializationError, error.to_string()).with_source(error)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Error body returned to the request router
///
/// Mirrors the `{success: false, error}` shape callers already understand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// Human-readable message
    pub error: String,
    /// Machine-readable code
    pub code: ErrorCode,
    /// Additional structured context
    #[serde(skip_serializing_if = "Value::is_null", default)]
    pub details: Value,
}

impl From<&AppError> for ErrorResponse {
    fn from(error: &AppError) -> Self {
        let details = match &error.details {
            Value::Object(map) if map.is_empty() => Value::Null,
            other => other.clone(),
        };
        Self {
            success: false,
            error: error.message.clone(),
            code: error.code,
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::MissingRequiredField.http_status(), 400);
        assert_eq!(ErrorCode::ModelTimeout.http_status(), 504);
        assert_eq!(ErrorCode::PlanGenerationFailed.http_status(), 502);
        assert_eq!(ErrorCode::PlanValidationFailed.http_status(), 400);
        assert_eq!(ErrorCode::InternalError.http_status(), 500);
    }

    #[test]
    fn test_model_failure_classification() {
        assert!(ErrorCode::ModelTimeout.is_model_failure());
        assert!(ErrorCode::MalformedOutput.is_model_failure());
        assert!(!ErrorCode::PlanGenerationFailed.is_model_failure());
        assert!(!ErrorCode::InvalidInput.is_model_failure());
    }

    #[test]
    fn test_error_response_serialization() {
        let error = AppError::missing_field("message");
        let response = ErrorResponse::from(&error);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "MISSING_REQUIRED_FIELD");
        assert_eq!(json["details"]["field"], "message");
    }

    #[test]
    fn test_plan_validation_failure_lists_errors() {
        let errors = vec![
            "Липсва седмичен план".to_owned(),
            "Липсват забранени храни".to_owned(),
        ];
        let error = AppError::plan_validation_failed(4, &errors);
        assert!(!error.code.is_model_failure());
        assert!(error
            .message
            .ends_with("след 4 опити за корекция: Липсва седмичен план; Липсват забранени храни"));

        let json = serde_json::to_value(ErrorResponse::from(&error)).unwrap();
        assert_eq!(json["code"], "PLAN_VALIDATION_FAILED");
        assert_eq!(json["details"]["validationErrors"][1], "Липсват забранени храни");
        assert_eq!(json["details"]["correctionAttempts"], 4);
    }

    #[test]
    fn test_empty_details_are_omitted() {
        let response = ErrorResponse::from(&AppError::internal("boom"));
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("details"));
    }
}

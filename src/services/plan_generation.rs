// ABOUTME: Plan generation domain service: input checks, user id, contradiction screen, validated pipeline run
// ABOUTME: Strips internal strategy justifications before the plan leaves the service
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

use aidiet_core::constants::internal_fields::STRATEGY_INTERNAL_FIELDS;
use aidiet_core::models::{PlanResponseBody, PlanResult, UserProfile};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::GenerationBudgets;
use crate::errors::{AppError, AppResult};
use crate::intelligence::{detect_goal_contradiction, GoalContradiction};
use crate::llm::ModelInvoker;
use crate::pipeline::StagePipeline;
use crate::prompts::PromptOverrides;

const USER_ID_LEN: usize = 32;

/// What plan generation produced
#[derive(Debug, Clone)]
pub enum PlanGenerationOutcome {
    /// A plan with internal fields removed
    Plan(PlanResult),
    /// The goal conflicts with the profile; no model call was made
    Contradiction(GoalContradiction),
}

/// Generates first plans from questionnaire profiles
pub struct PlanGenerationService<'a, I: ?Sized> {
    invoker: &'a I,
    overrides: &'a dyn PromptOverrides,
    budgets: GenerationBudgets,
}

impl<'a, I: ModelInvoker + ?Sized> PlanGenerationService<'a, I> {
    /// Create the service
    #[must_use]
    pub const fn new(
        invoker: &'a I,
        overrides: &'a dyn PromptOverrides,
        budgets: GenerationBudgets,
    ) -> Self {
        Self {
            invoker,
            overrides,
            budgets,
        }
    }

    /// Generate a plan for `profile`.
    ///
    /// Business rules:
    /// - `name`, `age`, `weight` and `height` are required
    /// - A goal contradiction short-circuits before any model call
    /// - The plan must pass quality validation, with correction prompts
    ///   and a simplified retry before giving up
    /// - Internal strategy justifications never reach the client
    ///
    /// # Errors
    ///
    /// Returns `MissingRequiredField` for an incomplete profile,
    /// `PlanGenerationFailed` when the pipeline and its fallback both fail,
    /// and `PlanValidationFailed` when no valid plan could be produced.
    pub async fn generate(&self, profile: &UserProfile) -> AppResult<PlanGenerationOutcome> {
        validate_required(profile)?;

        if let Some(contradiction) = detect_goal_contradiction(profile) {
            info!(kind = ?contradiction.kind, bmi = %contradiction.bmi, "Goal contradiction detected, skipping generation");
            return Ok(PlanGenerationOutcome::Contradiction(contradiction));
        }

        let mut plan = StagePipeline::new(self.invoker, self.overrides, self.budgets)
            .run_validated(profile)
            .await?;
        strip_internal_fields(&mut plan);
        Ok(PlanGenerationOutcome::Plan(plan))
    }

    /// Generate and wrap the outcome in the router's response body
    ///
    /// # Errors
    ///
    /// Same as [`Self::generate`].
    #[instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
    pub async fn respond(&self, profile: &UserProfile) -> AppResult<PlanResponseBody> {
        let outcome = self.generate(profile).await?;
        let user_id = derive_user_id(profile);
        info!(user_id = %user_id, "Plan request completed");

        Ok(match outcome {
            PlanGenerationOutcome::Plan(plan) => PlanResponseBody {
                success: true,
                user_id,
                plan: Some(plan),
                has_contradiction: false,
                warning_data: None,
            },
            PlanGenerationOutcome::Contradiction(contradiction) => PlanResponseBody {
                success: true,
                user_id,
                plan: None,
                has_contradiction: true,
                warning_data: serde_json::to_value(&contradiction).ok(),
            },
        })
    }
}

fn validate_required(profile: &UserProfile) -> AppResult<()> {
    if profile.name.as_deref().is_none_or(|name| name.trim().is_empty()) {
        return Err(AppError::missing_field("name"));
    }
    for (field, value) in [
        ("age", profile.age_value()),
        ("weight", profile.weight_value()),
        ("height", profile.height_value()),
    ] {
        if value.is_none() {
            return Err(AppError::missing_field(field));
        }
    }
    Ok(())
}

/// Remove strategy fields that only exist to steer generation
pub fn strip_internal_fields(plan: &mut PlanResult) {
    if let Some(strategy) = plan.strategy_mut() {
        for field in STRATEGY_INTERNAL_FIELDS {
            strategy.remove(*field);
        }
    }
}

/// Stable id for the client: the email when present, otherwise a base64 tag
#[must_use]
pub fn derive_user_id(profile: &UserProfile) -> String {
    if let Some(email) = profile.email.as_deref().filter(|email| !email.trim().is_empty()) {
        return email.to_owned();
    }
    let age = match &profile.age {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    let seed = format!(
        "{}_{}_{}",
        profile.name.as_deref().unwrap_or_default(),
        age,
        Utc::now().timestamp_millis()
    );
    STANDARD
        .encode(seed)
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(USER_ID_LEN)
        .collect()
}

// ABOUTME: Chat turn orchestration: prompt, single model call, directive handling, history windowing
// ABOUTME: Regenerates the plan through the stage pipeline when a modification-mode reply asks for it
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

use aidiet_core::models::{
    ChatMode, ChatRequestBody, ChatResponseBody, ExchangeTurn, PlanResult, UserProfile,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::chat::{
    merge_preferences, scan_reply, truncate_at_sentinel, window_history, DirectiveScan,
};
use crate::config::GenerationBudgets;
use crate::errors::{AppError, AppResult};
use crate::llm::{ModelInvoker, CHAT_STEP};
use crate::logging::AppLogger;
use crate::pipeline::StagePipeline;
use crate::prompts::{PromptBuilder, PromptOverrides};

/// Plan and profile produced by a chat-triggered regeneration
#[derive(Debug, Clone)]
pub struct Regeneration {
    /// New plan
    pub plan: PlanResult,
    /// Profile with the requested modifications merged in
    pub profile: UserProfile,
}

/// Runs one chat turn against a [`ModelInvoker`]
pub struct ChatOrchestrator<'a, I: ?Sized> {
    invoker: &'a I,
    overrides: &'a dyn PromptOverrides,
    budgets: GenerationBudgets,
}

impl<'a, I: ModelInvoker + ?Sized> ChatOrchestrator<'a, I> {
    /// Create an orchestrator
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

    /// Handle one client message.
    ///
    /// Business rules:
    /// - `message`, `userData` and `userPlan` are required
    /// - The prompt sees only the windowed history
    /// - Directives are stripped from the reply in every mode
    /// - Only modification mode merges preferences and regenerates the plan
    /// - A failed regeneration still returns the reply, with `planError` set
    /// - The returned history includes this turn and is windowed again
    ///
    /// # Errors
    ///
    /// Returns `MissingRequiredField` for an incomplete request and the
    /// invocation error when the chat model call itself fails.
    #[instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
    pub async fn handle(&self, request: ChatRequestBody) -> AppResult<ChatResponseBody> {
        let message = request
            .message
            .filter(|message| !message.trim().is_empty())
            .ok_or_else(|| AppError::missing_field("message"))?;
        let profile = request
            .user_data
            .ok_or_else(|| AppError::missing_field("userData"))?;
        let plan = request
            .user_plan
            .ok_or_else(|| AppError::missing_field("userPlan"))?;
        let mode = request.mode.unwrap_or_default();
        let mut log = request.conversation_history;

        let context = window_history(&log, self.budgets.history_tokens);
        let prompt = PromptBuilder::new(self.overrides).chat_prompt(
            &message,
            &profile,
            &plan,
            &context.turns,
            mode,
        );
        let reply = self
            .invoker
            .invoke(&prompt, self.budgets.chat_max_tokens, CHAT_STEP)
            .await?;

        let scan = scan_reply(&reply);
        let mut response = scan.visible_text().to_owned();
        let mut regeneration = None;
        let mut plan_error = None;

        match (&scan, mode) {
            (DirectiveScan::Absent { .. }, _) => {}
            (DirectiveScan::Malformed { payloads, .. }, _) => {
                AppLogger::log_directive_event("malformed", &mode.to_string(), payloads.len());
            }
            (DirectiveScan::Extracted { .. }, ChatMode::Consultation) => {
                AppLogger::log_directive_event(
                    "stripped",
                    &mode.to_string(),
                    scan.modifications().len(),
                );
            }
            (DirectiveScan::Extracted { .. }, ChatMode::Modification) => {
                let modifications = scan.modifications();
                AppLogger::log_directive_event("regenerate", &mode.to_string(), modifications.len());
                match self.regenerate(&profile, &modifications, &plan).await {
                    Ok(result) => regeneration = Some(result),
                    Err(e) => {
                        warn!(error = %e, "Plan regeneration failed, returning reply without a new plan");
                        response = truncate_at_sentinel(&reply);
                        plan_error = Some(e.message);
                    }
                }
            }
        }

        log.push(ExchangeTurn::user(message));
        log.push(ExchangeTurn::assistant(response.clone()));
        let history = window_history(&log, self.budgets.history_tokens);

        let (updated_plan, updated_user_data) =
            regeneration.map_or((None, None), |r| (Some(r.plan), Some(r.profile)));
        Ok(ChatResponseBody {
            success: true,
            response,
            conversation_history: history.turns,
            plan_updated: updated_plan.is_some(),
            updated_plan,
            updated_user_data,
            plan_error,
        })
    }

    /// Merge `modifications` into `profile` and run the stage pipeline on the result
    ///
    /// # Errors
    ///
    /// Returns the pipeline's terminal error.
    pub async fn regenerate(
        &self,
        profile: &UserProfile,
        modifications: &[String],
        current_plan: &PlanResult,
    ) -> AppResult<Regeneration> {
        let merged = merge_preferences(profile, modifications, Some(current_plan));
        if !merged.skipped.is_empty() {
            info!(skipped = ?merged.skipped, "Some modifications were not understood");
        }

        let plan = StagePipeline::new(self.invoker, self.overrides, self.budgets)
            .run(&merged.profile)
            .await?;
        info!(
            applied = merged.applied.len(),
            fallback_used = plan.meta.as_ref().is_some_and(|meta| meta.fallback_used),
            "Plan regenerated with chat modifications"
        );
        Ok(Regeneration {
            plan,
            profile: merged.profile,
        })
    }
}

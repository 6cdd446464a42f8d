// ABOUTME: Three-stage plan generation state machine with a single-shot fallback and a correction loop
// ABOUTME: Analysis feeds Strategy feeds Plan; failures switch once to a simpler prompt, invalid plans get repaired
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

//! # Stage Pipeline
//!
//! ```text
//! Analysis ──ok──▶ Strategy ──ok──▶ Plan ──ok──▶ Done
//!     │               │               │
//!     └──── fail ─────┴──── fail ─────┴──▶ Fallback ──ok──▶ Done
//!                                             └── fail ──▶ PlanGenerationFailed
//! ```
//!
//! Stages run strictly one after another because each prompt embeds the
//! previous stage's output. A stage fails when the invocation errors or
//! times out, or when its reply is not a JSON object free of an `error` key.
//! Partial stage outputs are never returned: the fallback prompt is built
//! from the profile alone and the fallback result carries its own minimal
//! analysis and strategy.
//!
//! [`StagePipeline::run_validated`] adds a quality gate on top of `run`:
//!
//! ```text
//! run ──▶ validate ──ok──▶ Done
//!            │
//!            └─ fail ─▶ Correction (up to N times) ──▶ validate ...
//!                          └─ still invalid ─▶ Fallback ──valid──▶ Done
//!                                                └─ invalid ─▶ PlanValidationFailed
//! ```

use std::fmt;

use aidiet_core::constants::budgets::PIPELINE_TOKEN_WARN_TOTAL;
use aidiet_core::constants::messages::{FALLBACK_DIETARY_MODIFIER, FALLBACK_DIET_TYPE};
use aidiet_core::models::{GenerationMeta, PlanResult, StageTokenUsage, UserProfile};
use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::config::GenerationBudgets;
use crate::errors::{AppError, AppResult};
use crate::intelligence::{energy_targets, estimate_tokens, validate_plan, PlanValidation};
use crate::llm::response_parser::parse_structured_reply;
use crate::llm::ModelInvoker;
use crate::logging::AppLogger;
use crate::prompts::{PromptBuilder, PromptOverrides};

/// One model round-trip of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Holistic profile analysis
    Analysis,
    /// Dietary strategy
    Strategy,
    /// Seven-day meal plan
    Plan,
    /// Simplified single-shot plan
    Fallback,
    /// Repair of a plan that failed validation
    Correction,
}

impl PipelineStage {
    /// Step name used in logs and errors
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Strategy => "strategy",
            Self::Plan => "plan",
            Self::Fallback => "fallback",
            Self::Correction => "plan_correction",
        }
    }

    /// Client-facing stage label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Analysis => "Стъпка 1 (Анализ)",
            Self::Strategy => "Стъпка 2 (Стратегия)",
            Self::Plan => "Стъпка 3 (Хранителен план)",
            Self::Fallback => "Опростен план",
            Self::Correction => "Корекция на плана",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single stage
#[derive(Debug)]
pub enum StageOutcome {
    /// Reply parsed into a usable document
    Success(Map<String, Value>),
    /// Invocation failed or the reply was unusable
    Failure(AppError),
}

enum PipelineState {
    Analysis,
    Strategy {
        analysis: Map<String, Value>,
    },
    Plan {
        analysis: Map<String, Value>,
        strategy: Map<String, Value>,
    },
    Done(PlanResult),
    Fallback {
        failed: PipelineStage,
        cause: AppError,
    },
}

/// Runs plan generation against a [`ModelInvoker`]
pub struct StagePipeline<'a, I: ?Sized> {
    invoker: &'a I,
    prompts: PromptBuilder<'a>,
    budgets: GenerationBudgets,
}

impl<'a, I: ModelInvoker + ?Sized> StagePipeline<'a, I> {
    /// Create a pipeline over `invoker` using templates from `overrides`
    #[must_use]
    pub const fn new(
        invoker: &'a I,
        overrides: &'a dyn PromptOverrides,
        budgets: GenerationBudgets,
    ) -> Self {
        Self {
            invoker,
            prompts: PromptBuilder::new(overrides),
            budgets,
        }
    }

    /// Generate a plan for `profile`
    ///
    /// # Errors
    ///
    /// Returns `PlanGenerationFailed`, with the fallback's failure as source,
    /// when both the staged attempt and the single-shot fallback fail.
    pub async fn run(&self, profile: &UserProfile) -> AppResult<PlanResult> {
        let mut usage = StageTokenUsage::default();
        let mut state = PipelineState::Analysis;

        loop {
            state = match state {
                PipelineState::Analysis => {
                    let prompt = self.prompts.analysis_prompt(profile);
                    let outcome = self
                        .run_stage(
                            PipelineStage::Analysis,
                            &prompt,
                            self.budgets.stage_max_tokens,
                            &mut usage,
                        )
                        .await;
                    match outcome {
                        StageOutcome::Success(mut analysis) => {
                            drop_normal_problems(&mut analysis);
                            AppLogger::log_stage_transition("analysis", "strategy", usage.total);
                            PipelineState::Strategy { analysis }
                        }
                        StageOutcome::Failure(cause) => PipelineState::Fallback {
                            failed: PipelineStage::Analysis,
                            cause,
                        },
                    }
                }
                PipelineState::Strategy { analysis } => {
                    let prompt = self.prompts.strategy_prompt(profile, &analysis);
                    let outcome = self
                        .run_stage(
                            PipelineStage::Strategy,
                            &prompt,
                            self.budgets.stage_max_tokens,
                            &mut usage,
                        )
                        .await;
                    match outcome {
                        StageOutcome::Success(strategy) => {
                            AppLogger::log_stage_transition("strategy", "plan", usage.total);
                            PipelineState::Plan { analysis, strategy }
                        }
                        StageOutcome::Failure(cause) => PipelineState::Fallback {
                            failed: PipelineStage::Strategy,
                            cause,
                        },
                    }
                }
                PipelineState::Plan { analysis, strategy } => {
                    let prompt = self.prompts.plan_prompt(profile, &analysis, &strategy);
                    let outcome = self
                        .run_stage(
                            PipelineStage::Plan,
                            &prompt,
                            self.budgets.plan_max_tokens,
                            &mut usage,
                        )
                        .await;
                    match outcome {
                        StageOutcome::Success(plan) => {
                            AppLogger::log_stage_transition("plan", "done", usage.total);
                            PipelineState::Done(compose(
                                plan,
                                Value::Object(analysis),
                                Value::Object(strategy),
                                GenerationMeta {
                                    token_usage: usage,
                                    generated_at: Utc::now(),
                                    fallback_used: false,
                                    failed_stage: None,
                                    correction_attempts: 0,
                                },
                            ))
                        }
                        StageOutcome::Failure(cause) => PipelineState::Fallback {
                            failed: PipelineStage::Plan,
                            cause,
                        },
                    }
                }
                PipelineState::Fallback { failed, cause } => {
                    AppLogger::log_stage_failure(failed.as_str(), &cause.to_string());
                    PipelineState::Done(self.run_fallback(profile, failed, &mut usage).await?)
                }
                PipelineState::Done(result) => {
                    warn_on_usage(usage);
                    return Ok(result);
                }
            };
        }
    }

    /// Generate a plan that passes [`validate_plan`]
    ///
    /// A plan failing validation is sent back with its errors in a
    /// correction prompt, up to `correction_attempts` times. A correction
    /// reply that cannot be parsed uses up its attempt and leaves the plan as
    /// it was. If the plan is still invalid, a simplified single-shot plan is
    /// tried and kept only when it validates.
    ///
    /// # Errors
    ///
    /// Returns what [`Self::run`] returns, or `PlanValidationFailed` listing
    /// the last validation errors when neither corrections nor the simplified
    /// plan produce a valid plan.
    pub async fn run_validated(&self, profile: &UserProfile) -> AppResult<PlanResult> {
        let plan = self.run(profile).await?;
        let mut usage = plan
            .meta
            .as_ref()
            .map_or_else(StageTokenUsage::default, |meta| meta.token_usage);

        let (mut plan, report, attempts) = self.correct(profile, plan, &mut usage).await;
        if !report.is_valid() {
            warn!(
                attempts,
                errors = ?report.errors,
                "Plan still invalid after corrections, trying simplified plan"
            );
            plan = self
                .validated_fallback(profile, &mut usage)
                .await
                .ok_or_else(|| AppError::plan_validation_failed(attempts, &report.errors))?;
        }

        if let Some(meta) = plan.meta.as_mut() {
            meta.token_usage = usage;
            meta.correction_attempts = attempts;
        }
        Ok(plan)
    }

    /// Send correction prompts until the plan validates or attempts run out
    async fn correct(
        &self,
        profile: &UserProfile,
        mut plan: PlanResult,
        usage: &mut StageTokenUsage,
    ) -> (PlanResult, PlanValidation, u32) {
        let mut report = validate_plan(&plan, profile);
        let mut attempts = 0;

        while !report.is_valid() && attempts < self.budgets.correction_attempts {
            attempts += 1;
            warn!(
                attempt = attempts,
                max_attempts = self.budgets.correction_attempts,
                errors = ?report.errors,
                "Plan failed validation, requesting correction"
            );
            let prompt = self.prompts.correction_prompt(profile, &plan, &report.errors);
            let outcome = self
                .run_stage(
                    PipelineStage::Correction,
                    &prompt,
                    self.budgets.correction_max_tokens,
                    usage,
                )
                .await;
            match outcome {
                StageOutcome::Success(corrected) => {
                    plan = apply_correction(plan, corrected);
                    report = validate_plan(&plan, profile);
                    info!(attempt = attempts, valid = report.is_valid(), "Plan correction applied");
                }
                StageOutcome::Failure(cause) => {
                    warn!(attempt = attempts, error = %cause, "Plan correction failed");
                }
            }
        }
        (plan, report, attempts)
    }

    /// Simplified single-shot plan, kept only if it validates
    async fn validated_fallback(
        &self,
        profile: &UserProfile,
        usage: &mut StageTokenUsage,
    ) -> Option<PlanResult> {
        let simplified = match self
            .run_fallback(profile, PipelineStage::Correction, usage)
            .await
        {
            Ok(simplified) => simplified,
            Err(e) => {
                warn!(error = %e, "Simplified plan generation failed");
                return None;
            }
        };
        let report = validate_plan(&simplified, profile);
        if report.is_valid() {
            info!("Simplified plan passed validation");
            Some(simplified)
        } else {
            warn!(errors = ?report.errors, "Simplified plan also failed validation");
            None
        }
    }

    /// Invoke one stage and validate its reply
    async fn run_stage(
        &self,
        stage: PipelineStage,
        prompt: &str,
        max_tokens: u32,
        usage: &mut StageTokenUsage,
    ) -> StageOutcome {
        let input_tokens = estimate_tokens(prompt);
        let reply = match self.invoker.invoke(prompt, max_tokens, stage.as_str()).await {
            Ok(reply) => reply,
            Err(e) => {
                usage.record(input_tokens, 0);
                return StageOutcome::Failure(e);
            }
        };
        let output_tokens = estimate_tokens(&reply);
        usage.record(input_tokens, output_tokens);
        info!(
            stage = stage.as_str(),
            input_tokens,
            output_tokens,
            cumulative_tokens = usage.total,
            "Stage completed"
        );

        match parse_structured_reply(&reply) {
            Ok(document) => StageOutcome::Success(document),
            Err(failure) => StageOutcome::Failure(AppError::malformed_output(
                stage.as_str(),
                format!("{}: {failure}", stage.label()),
            )),
        }
    }

    /// Single-shot plan built from the profile alone
    async fn run_fallback(
        &self,
        profile: &UserProfile,
        failed: PipelineStage,
        usage: &mut StageTokenUsage,
    ) -> AppResult<PlanResult> {
        let energy = energy_targets(profile).ok();
        let prompt = self.prompts.fallback_prompt(profile, energy.as_ref());

        let outcome = self
            .run_stage(
                PipelineStage::Fallback,
                &prompt,
                self.budgets.plan_max_tokens,
                usage,
            )
            .await;
        let plan = match outcome {
            StageOutcome::Success(plan) => plan,
            StageOutcome::Failure(cause) => {
                warn!(failed_stage = failed.as_str(), error = %cause, "Fallback plan generation failed");
                return Err(AppError::plan_generation_failed(format!(
                    "Генерирането на план се провали ({}), опростеният план също не успя",
                    failed.label()
                ))
                .with_source(cause));
            }
        };
        info!(failed_stage = failed.as_str(), "Plan produced by single-shot fallback");

        let name = profile.name.as_deref().unwrap_or_default();
        let goal = profile.goal.as_deref().unwrap_or_default();
        let analysis = json!({
            "bmr": energy.map(|targets| targets.bmr),
            "recommendedCalories": energy.map(|targets| targets.recommended_calories),
            "keyProblems": [],
        });
        let strategy = json!({
            "planJustification": format!(
                "Опростен план, създаден автоматично за {name} с цел {goal}. Използва основни принципи на здравословното хранене."
            ),
            "dietaryModifier": FALLBACK_DIETARY_MODIFIER,
            "dietType": FALLBACK_DIET_TYPE,
        });

        Ok(compose(
            plan,
            analysis,
            strategy,
            GenerationMeta {
                token_usage: *usage,
                generated_at: Utc::now(),
                fallback_used: true,
                failed_stage: Some(failed.as_str().to_owned()),
                correction_attempts: 0,
            },
        ))
    }
}

/// Plan fields beside the analysis and strategy that produced them
///
/// Stage keys the plan reply happens to contain are replaced, so the
/// composite always reflects this run's earlier stages.
fn compose(
    mut plan: Map<String, Value>,
    analysis: Value,
    strategy: Value,
    meta: GenerationMeta,
) -> PlanResult {
    for key in ["analysis", "strategy", "_meta"] {
        plan.remove(key);
    }
    PlanResult {
        fields: plan,
        analysis,
        strategy,
        meta: Some(meta),
    }
}

/// Corrected plan fields with the previous run's bookkeeping
///
/// A correction reply that omits `analysis` or `strategy` keeps the ones the
/// plan already had.
fn apply_correction(previous: PlanResult, mut corrected: Map<String, Value>) -> PlanResult {
    let mut section = |key: &str, fallback: Value| {
        corrected
            .remove(key)
            .filter(|value| !value.is_null())
            .unwrap_or(fallback)
    };
    let analysis = section("analysis", previous.analysis);
    let strategy = section("strategy", previous.strategy);
    corrected.remove("_meta");
    PlanResult {
        fields: corrected,
        analysis,
        strategy,
        meta: previous.meta,
    }
}

/// Remove `keyProblems` entries whose severity is `Normal`
fn drop_normal_problems(analysis: &mut Map<String, Value>) {
    if let Some(Value::Array(problems)) = analysis.get_mut("keyProblems") {
        let before = problems.len();
        problems.retain(|problem| {
            problem
                .get("severity")
                .and_then(Value::as_str)
                .is_none_or(|severity| !severity.trim().eq_ignore_ascii_case("normal"))
        });
        if problems.len() < before {
            info!(removed = before - problems.len(), "Dropped key problems with Normal severity");
        }
    }
}

fn warn_on_usage(usage: StageTokenUsage) {
    if usage.total > PIPELINE_TOKEN_WARN_TOTAL {
        warn!(
            total_tokens = usage.total,
            threshold = PIPELINE_TOKEN_WARN_TOTAL,
            "Plan generation exceeded the cumulative token threshold"
        );
    }
}

// ABOUTME: Integration tests for the three-stage plan pipeline and its single-shot fallback
// ABOUTME: Drives the pipeline with scripted model replies and checks prompts, composition, and failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use aidiet_server::config::GenerationBudgets;
use aidiet_server::errors::{AppError, ErrorCode};
use aidiet_server::pipeline::StagePipeline;
use aidiet_server::prompts::{NoOverrides, PromptKind, StaticOverrides};
use common::{
    analysis_reply, init_test_logging, plan_reply, sample_profile, strategy_reply,
    ScriptedInvoker,
};
use serde_json::json;

// ============================================================================
// Staged path
// ============================================================================

#[tokio::test]
async fn test_three_stages_compose_plan() {
    init_test_logging();
    let invoker = ScriptedInvoker::new()
        .reply(analysis_reply())
        .reply(strategy_reply())
        .reply(plan_reply());
    let budgets = GenerationBudgets::default();

    let plan = StagePipeline::new(&invoker, &NoOverrides, budgets)
        .run(&sample_profile())
        .await
        .unwrap();

    assert_eq!(invoker.steps(), ["analysis", "strategy", "plan"]);
    let calls = invoker.calls();
    assert_eq!(calls[0].max_tokens, budgets.stage_max_tokens);
    assert_eq!(calls[2].max_tokens, budgets.plan_max_tokens);

    // Each prompt embeds the previous stage's output
    assert!(calls[1].prompt.contains("Късна вечеря"));
    assert!(calls[2].prompt.contains("Средиземноморска"));
    assert!(calls[2].prompt.contains("2345"));

    assert!(plan.fields.contains_key("weekPlan"));
    assert_eq!(plan.strategy["dietType"], "Средиземноморска");
    assert_eq!(
        plan.analysis["keyProblems"],
        json!([{"title": "Късна вечеря", "severity": "Borderline", "description": "Вечеря след 22ч"}])
    );

    let meta = plan.meta.unwrap();
    assert!(!meta.fallback_used);
    assert!(meta.failed_stage.is_none());
    assert!(meta.token_usage.input > 0);
    assert!(meta.token_usage.output > 0);
    assert_eq!(
        meta.token_usage.total,
        meta.token_usage.input + meta.token_usage.output
    );
}

#[tokio::test]
async fn test_prompt_override_replaces_analysis_template() {
    init_test_logging();
    let overrides = StaticOverrides::new().with(
        PromptKind::Analysis,
        "Анализирай {name} ({age} г.) ФОРМАТ НА АНАЛИЗА",
    );
    let invoker = ScriptedInvoker::new()
        .reply(analysis_reply())
        .reply(strategy_reply())
        .reply(plan_reply());

    StagePipeline::new(&invoker, &overrides, GenerationBudgets::default())
        .run(&sample_profile())
        .await
        .unwrap();

    assert_eq!(invoker.calls()[0].prompt, "Анализирай Иван (30 г.) ФОРМАТ НА АНАЛИЗА");
}

// ============================================================================
// Fallback path
// ============================================================================

#[tokio::test]
async fn test_strategy_failure_uses_fallback_without_partial_analysis() {
    init_test_logging();
    let invoker = ScriptedInvoker::new()
        .reply(analysis_reply())
        .reply("Съжалявам, не мога да отговоря.")
        .reply(plan_reply());

    let plan = StagePipeline::new(&invoker, &NoOverrides, GenerationBudgets::default())
        .run(&sample_profile())
        .await
        .unwrap();

    assert_eq!(invoker.steps(), ["analysis", "strategy", "fallback"]);

    // The fallback prompt is built from the profile alone
    let fallback_prompt = &invoker.calls()[2].prompt;
    assert!(!fallback_prompt.contains("Късна вечеря"));
    assert!(fallback_prompt.contains("1780"));

    // Minimal analysis computed locally, not the analysis stage output
    assert_eq!(plan.analysis["bmr"], 1780);
    assert_eq!(plan.analysis["recommendedCalories"], 2345);
    assert_eq!(plan.analysis["keyProblems"], json!([]));
    assert!(plan.analysis.get("successChance").is_none());
    assert_eq!(plan.strategy["dietType"], "Балансирана");
    assert!(plan.strategy["planJustification"]
        .as_str()
        .unwrap()
        .contains("Иван"));

    let meta = plan.meta.unwrap();
    assert!(meta.fallback_used);
    assert_eq!(meta.failed_stage.as_deref(), Some("strategy"));
}

#[tokio::test]
async fn test_analysis_invocation_error_goes_straight_to_fallback() {
    init_test_logging();
    let invoker = ScriptedInvoker::new()
        .fail(AppError::model_timeout("analysis", 90))
        .reply(plan_reply());

    let plan = StagePipeline::new(&invoker, &NoOverrides, GenerationBudgets::default())
        .run(&sample_profile())
        .await
        .unwrap();

    assert_eq!(invoker.steps(), ["analysis", "fallback"]);
    assert_eq!(
        plan.meta.unwrap().failed_stage.as_deref(),
        Some("analysis")
    );
}

#[tokio::test]
async fn test_reported_error_key_counts_as_stage_failure() {
    init_test_logging();
    let invoker = ScriptedInvoker::new()
        .reply(analysis_reply())
        .reply(strategy_reply())
        .reply(r#"{"error": "не мога да създам план"}"#)
        .reply(plan_reply());

    let plan = StagePipeline::new(&invoker, &NoOverrides, GenerationBudgets::default())
        .run(&sample_profile())
        .await
        .unwrap();

    assert_eq!(invoker.steps(), ["analysis", "strategy", "plan", "fallback"]);
    assert_eq!(plan.meta.unwrap().failed_stage.as_deref(), Some("plan"));
}

#[tokio::test]
async fn test_fallback_failure_is_terminal() {
    init_test_logging();
    let invoker = ScriptedInvoker::new()
        .reply(analysis_reply())
        .reply(strategy_reply())
        .reply("няма план")
        .reply("[1, 2, 3]");

    let err = StagePipeline::new(&invoker, &NoOverrides, GenerationBudgets::default())
        .run(&sample_profile())
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::PlanGenerationFailed);
    assert!(err.message.contains("Стъпка 3"));
    assert_eq!(invoker.calls().len(), 4);
    assert_eq!(invoker.remaining(), 0);
}

#[tokio::test]
async fn test_fallback_without_computable_energy() {
    init_test_logging();
    let mut profile = sample_profile();
    profile.gender = None;
    let invoker = ScriptedInvoker::new()
        .fail(AppError::external_service("test", "unavailable"))
        .reply(plan_reply());

    let plan = StagePipeline::new(&invoker, &NoOverrides, GenerationBudgets::default())
        .run(&profile)
        .await
        .unwrap();

    assert!(plan.analysis["bmr"].is_null());
    assert!(plan.meta.unwrap().fallback_used);
}

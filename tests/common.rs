// ABOUTME: Shared test utilities for integration tests
// ABOUTME: Provides logging setup, a scripted model invoker, and profile/plan/reply fixtures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used
)]
//! Shared test utilities for `aidiet_server`
//!
//! The scripted invoker stands in for the model: every test queues the exact
//! replies it expects the code under test to consume, then inspects the
//! recorded prompts.

use std::collections::VecDeque;
use std::env;
use std::sync::{Mutex, Once};

use aidiet_server::errors::{AppError, AppResult};
use aidiet_server::llm::ModelInvoker;
use aidiet_server::models::{PlanResult, UserProfile};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::Level;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => Level::TRACE,
            Ok("DEBUG") => Level::DEBUG,
            Ok("INFO") => Level::INFO,
            _ => Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

// ============================================================================
// Scripted invoker
// ============================================================================

/// One invocation observed by [`ScriptedInvoker`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub prompt: String,
    pub max_tokens: u32,
    pub step: String,
}

/// Model stand-in that replays queued replies in order
///
/// Once the queue is empty every further call fails, so an unexpected extra
/// invocation shows up as an error rather than a hang.
#[derive(Debug, Default)]
pub struct ScriptedInvoker {
    replies: Mutex<VecDeque<AppResult<String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    /// Queue an invocation failure
    pub fn fail(self, error: AppError) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn steps(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.step).collect()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelInvoker for ScriptedInvoker {
    async fn invoke(&self, prompt: &str, max_tokens: u32, step: &str) -> AppResult<String> {
        self.calls.lock().unwrap().push(RecordedCall {
            prompt: prompt.to_owned(),
            max_tokens,
            step: step.to_owned(),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::external_service("scripted", "no reply queued")))
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// Questionnaire profile with no goal contradiction (BMI 24.7)
pub fn sample_profile() -> UserProfile {
    serde_json::from_value(json!({
        "name": "Иван",
        "email": "ivan@example.bg",
        "age": 30,
        "weight": "80",
        "height": 180,
        "gender": "Мъж",
        "goal": "Отслабване",
        "sportActivity": "Средна (2–4 дни седмично)",
        "sleepHours": 7,
        "medicalConditions": ["Няма"],
        "dietDislike": "лук",
        "dietLove": "риба",
        "city": "Пловдив"
    }))
    .unwrap()
}

pub fn analysis_document() -> Value {
    json!({
        "bmr": 1780,
        "tdee": 2759,
        "recommendedCalories": 2345,
        "macroRatios": {"protein": 30, "carbs": 40, "fats": 30},
        "keyProblems": [
            {"title": "Късна вечеря", "severity": "Borderline", "description": "Вечеря след 22ч"},
            {"title": "Хидратация", "severity": "Normal", "description": "Добра"}
        ],
        "successChance": 72
    })
}

pub fn strategy_document() -> Value {
    json!({
        "dietType": "Средиземноморска",
        "dietaryModifier": "Балансирано",
        "planJustification": "Умерен дефицит с акцент върху риба",
        "mealTiming": {"pattern": "3 хранения"},
        "longTermStrategy": "Вътрешна бележка",
        "mealCountJustification": "Вътрешна бележка",
        "afterDinnerMealJustification": "Вътрешна бележка"
    })
}

fn meal(kind: &str, name: &str, calories: u32, protein: u32, carbs: u32, fats: u32) -> Value {
    json!({
        "type": kind,
        "name": name,
        "weight": "300g",
        "calories": calories,
        "macros": {"protein": protein, "carbs": carbs, "fats": fats, "fiber": 6}
    })
}

/// A full week that passes plan validation
pub fn plan_document() -> Value {
    let week: Map<String, Value> = (1..=7)
        .map(|day| {
            let breakfast = if day == 1 {
                "Овесена каша с мед"
            } else {
                "Кисело мляко с ядки"
            };
            let meals = json!([
                meal("Закуска", breakfast, 420, 15, 60, 13),
                meal("Обяд", "Печена риба със салата", 650, 45, 50, 28),
                meal("Вечеря", "Пилешка супа", 480, 35, 45, 16)
            ]);
            (format!("day{day}"), json!({ "meals": meals }))
        })
        .collect();

    json!({
        "summary": {"bmr": "1780", "dailyCalories": "2345"},
        "weekPlan": week,
        "recommendations": ["Пий повече вода", "Риба два пъти седмично", "Пълнозърнести храни"],
        "forbidden": ["Газирани напитки", "Пържени храни", "Бели захари"]
    })
}

/// A plan the validator rejects: one day, one meal without macros
pub fn invalid_plan_document() -> Value {
    json!({
        "summary": {"bmr": "1780", "dailyCalories": "2345"},
        "weekPlan": {
            "day1": {"meals": [{"type": "Закуска", "name": "Овесена каша с мед", "calories": 420}]}
        },
        "recommendations": ["Пий повече вода"],
        "forbidden": ["Газирани напитки"]
    })
}

/// Analysis reply wrapped the way models often answer: prose plus a fenced block
pub fn analysis_reply() -> String {
    format!(
        "Ето анализа:\n```json\n{}\n```",
        serde_json::to_string_pretty(&analysis_document()).unwrap()
    )
}

pub fn strategy_reply() -> String {
    strategy_document().to_string()
}

pub fn plan_reply() -> String {
    plan_document().to_string()
}

/// A plan the client already holds
pub fn sample_plan() -> PlanResult {
    let mut plan = plan_document();
    plan["analysis"] = json!({"bmr": 1780});
    plan["strategy"] = json!({"dietType": "Средиземноморска"});
    serde_json::from_value(plan).unwrap()
}

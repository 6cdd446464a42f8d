// ABOUTME: Offline provider returning canned replies for development without API keys
// ABOUTME: Recognizes chat, analysis, strategy, plan, and correction prompts by their output contracts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

//! # Mock Provider
//!
//! Deterministic stand-in selected when no backend key is configured. The
//! values it returns are placeholders and never personalized, but the canned
//! plan is shaped to pass plan validation so offline runs complete.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::warn;

use super::{ChatRequest, ChatResponse, LlmCapabilities, LlmProvider};
use crate::errors::AppError;
use crate::prompts::markers;

const MOCK_MODEL: &str = "mock";

/// Canned-reply provider
#[derive(Debug, Clone, Copy, Default)]
pub struct MockProvider;

impl MockProvider {
    /// Create a mock provider
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Pick a canned reply for the prompt
    fn reply_for(prompt: &str) -> String {
        if prompt.contains(markers::CHAT_REPLY_CUE) {
            return "Това е примерен отговор от тестов режим. Свържете реален модел за персонализирани съвети.".to_owned();
        }
        let document = if prompt.contains(markers::CORRECTION_CONTRACT)
            || prompt.contains(markers::PLAN_CONTRACT)
        {
            Self::plan()
        } else if prompt.contains(markers::STRATEGY_CONTRACT) {
            Self::strategy()
        } else if prompt.contains(markers::ANALYSIS_CONTRACT) {
            Self::analysis()
        } else {
            return "Тестов режим: няма подходящ примерен отговор.".to_owned();
        };
        document.to_string()
    }

    fn analysis() -> Value {
        json!({
            "bmr": 0,
            "tdee": 0,
            "recommendedCalories": 0,
            "macroRatios": {"protein": 30, "carbs": 40, "fats": 30},
            "keyProblems": [
                {"title": "Примерен проблем (MOCK)", "severity": "Borderline"},
                {"title": "Нормален показател (MOCK)", "severity": "Normal"}
            ]
        })
    }

    fn strategy() -> Value {
        json!({
            "dietType": "Балансирана",
            "dietaryModifier": "Балансирано",
            "planJustification": "Примерна обосновка (MOCK)",
            "mealTiming": {"pattern": "3 хранения дневно"},
            "longTermStrategy": "Вътрешна бележка (MOCK)",
            "mealCountJustification": "Вътрешна бележка (MOCK)",
            "afterDinnerMealJustification": "Вътрешна бележка (MOCK)"
        })
    }

    fn plan() -> Value {
        let week_plan: Map<String, Value> = (1..=7)
            .map(|day| {
                (
                    format!("day{day}"),
                    json!({
                        "meals": [
                            {
                                "type": "Закуска", "name": "Примерна закуска (MOCK)", "weight": "250g",
                                "calories": 400,
                                "macros": {"protein": 20, "carbs": 50, "fats": 13, "fiber": 6}
                            },
                            {
                                "type": "Обяд", "name": "Примерен обяд (MOCK)", "weight": "350g",
                                "calories": 600,
                                "macros": {"protein": 40, "carbs": 65, "fats": 20, "fiber": 9}
                            },
                            {
                                "type": "Вечеря", "name": "Примерна вечеря (MOCK)", "weight": "300g",
                                "calories": 500,
                                "macros": {"protein": 35, "carbs": 45, "fats": 20, "fiber": 8}
                            }
                        ]
                    }),
                )
            })
            .collect();

        json!({
            "summary": {
                "bmr": "XXXX (MOCK)",
                "dailyCalories": "XXXX (MOCK)",
                "macros": {"protein": "XXXg (MOCK)", "carbs": "XXXg (MOCK)", "fats": "XXXg (MOCK)"}
            },
            "weekPlan": week_plan,
            "recommendations": [
                "Примерна препоръка 1 (MOCK)",
                "Примерна препоръка 2 (MOCK)",
                "Примерна препоръка 3 (MOCK)"
            ],
            "forbidden": [
                "Примерна забрана 1 (MOCK)",
                "Примерна забрана 2 (MOCK)",
                "Примерна забрана 3 (MOCK)"
            ],
            "psychology": ["Примерен съвет (MOCK)"],
            "waterIntake": "2 л (MOCK)",
            "supplements": []
        })
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn display_name(&self) -> &'static str {
        "Mock (offline)"
    }

    fn capabilities(&self) -> LlmCapabilities {
        LlmCapabilities::OFFLINE | LlmCapabilities::JSON_MODE
    }

    fn default_model(&self) -> &str {
        MOCK_MODEL
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        warn!("Mock provider selected, returning canned reply");
        Ok(ChatResponse {
            content: Self::reply_for(request.last_user_text()),
            model: MOCK_MODEL.to_owned(),
            usage: None,
            finish_reason: Some("stop".to_owned()),
        })
    }
}

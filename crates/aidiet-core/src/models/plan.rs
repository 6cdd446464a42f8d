// ABOUTME: Composite meal plan record produced by the stage pipeline
// ABOUTME: Plan fields are flattened next to the analysis and strategy that produced them
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Terminal artifact of plan generation
///
/// The plan stage's own fields are opaque to the core and kept in `fields`;
/// `analysis` and `strategy` carry the earlier stage outputs so every plan
/// stays traceable to the reasoning behind it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// Plan stage fields (week plan, summary, recommendations, ...)
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    /// Analysis stage output
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub analysis: Value,
    /// Strategy stage output
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub strategy: Value,
    /// Generation bookkeeping
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<GenerationMeta>,
}

impl PlanResult {
    /// Whether any meal in the week plan names `food`
    ///
    /// Case-insensitive substring search over meal `name` and `description`.
    /// Analysis, strategy and recommendation text are not meals and are ignored.
    #[must_use]
    pub fn mentions_food(&self, food: &str) -> bool {
        let needle = food.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }
        self.meals().any(|meal| {
            ["name", "description"]
                .iter()
                .filter_map(|key| meal.get(*key).and_then(Value::as_str))
                .any(|text| text.to_lowercase().contains(&needle))
        })
    }

    /// Every meal object across the days of `weekPlan`
    #[must_use]
    pub fn meals(&self) -> impl Iterator<Item = &Map<String, Value>> {
        self.fields
            .get("weekPlan")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|days| days.values())
            .filter_map(|day| day.get("meals").and_then(Value::as_array))
            .flatten()
            .filter_map(Value::as_object)
    }

    /// Strategy as a JSON object, if it is one
    #[must_use]
    pub fn strategy_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.strategy.as_object_mut()
    }
}

/// Estimated token consumption of one generation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTokenUsage {
    /// Estimated prompt tokens
    pub input: usize,
    /// Estimated reply tokens
    pub output: usize,
    /// Sum of input and output
    pub total: usize,
}

impl StageTokenUsage {
    /// Add one invocation's prompt and reply estimates
    pub fn record(&mut self, input: usize, output: usize) {
        self.input += input;
        self.output += output;
        self.total = self.input + self.output;
    }
}

/// Bookkeeping attached to a generated plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMeta {
    /// Cumulative estimated usage across every invocation of the run
    pub token_usage: StageTokenUsage,
    /// When the plan was composed
    pub generated_at: DateTime<Utc>,
    /// Whether the single-shot fallback produced the plan
    pub fallback_used: bool,
    /// Stage whose failure triggered the fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<String>,
    /// Correction prompts needed before the plan passed validation
    #[serde(default)]
    pub correction_attempts: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_fields_flatten_beside_stages() {
        let plan: PlanResult = serde_json::from_value(json!({
            "weekPlan": {"day1": {"meals": []}},
            "analysis": {"bmr": 1700},
            "strategy": {"dietType": "Средиземноморска"}
        }))
        .unwrap();

        assert!(plan.fields.contains_key("weekPlan"));
        assert!(!plan.fields.contains_key("analysis"));
        assert_eq!(plan.analysis["bmr"], 1700);
        assert!(plan.meta.is_none());
    }

    #[test]
    fn test_mentions_food_is_case_insensitive() {
        let plan: PlanResult = serde_json::from_value(json!({
            "weekPlan": {"day1": {"meals": [{"name": "Овесена каша с Мед"}]}}
        }))
        .unwrap();

        assert!(plan.mentions_food("мед"));
        assert!(!plan.mentions_food("лук"));
        assert!(!plan.mentions_food("  "));
    }

    #[test]
    fn test_mentions_food_ignores_non_meal_text() {
        let plan: PlanResult = serde_json::from_value(json!({
            "weekPlan": {
                "day1": {"meals": [{"name": "Пилешка супа", "description": "с моркови"}]}
            },
            "recommendations": ["Избягвай захар"],
            "analysis": {"keyProblems": [{"title": "Недостиг на риба"}]},
            "strategy": {"dietaryModifier": "Без глутен", "foodsToAvoid": ["бял хляб"]}
        }))
        .unwrap();

        assert!(plan.mentions_food("моркови"));
        assert!(!plan.mentions_food("риба"));
        assert!(!plan.mentions_food("глутен"));
        assert!(!plan.mentions_food("хляб"));
        assert!(!plan.mentions_food("захар"));
        assert_eq!(plan.meals().count(), 1);
    }
}

// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Sentinel markers, token budgets, modification keywords, and fixed user-facing text
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

//! Constants module
//!
//! Constants are grouped into logical domains. The directive sentinel is a
//! contract shared with the chat prompt templates: changing its spelling
//! requires updating both sides.

/// Embedded directive markers understood by the chat orchestrator
pub mod directives {
    /// Literal token opening an embedded plan-regeneration payload
    pub const REGENERATE_PLAN_SENTINEL: &str = "[REGENERATE_PLAN:";

    /// Prefix that turns a modification into a parameterized food exclusion
    pub const EXCLUDE_FOOD_PREFIX: &str = "exclude_food:";

    /// Key of the modification array inside a directive payload
    pub const MODIFICATIONS_KEY: &str = "modifications";
}

/// Token budgets and per-call output limits
pub mod budgets {
    /// Maximum estimated tokens retained in the conversation history
    pub const HISTORY_TOKEN_BUDGET: usize = 2000;

    /// Output cap for a single chat reply
    pub const CHAT_MAX_TOKENS: u32 = 2000;

    /// Output cap for the analysis and strategy stages
    pub const STAGE_MAX_TOKENS: u32 = 4000;

    /// Output cap for the plan stage and the single-shot fallback
    pub const PLAN_MAX_TOKENS: u32 = 8000;

    /// Input size above which a prompt is logged as large
    pub const LARGE_PROMPT_WARN_TOKENS: usize = 8000;

    /// Input size above which a prompt is logged as at risk of truncation
    pub const LARGE_PROMPT_ERROR_TOKENS: usize = 12000;

    /// Cumulative pipeline usage above which a warning is emitted
    pub const PIPELINE_TOKEN_WARN_TOTAL: usize = 25000;

    /// Default per-invocation deadline in seconds
    pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 90;

    /// Correction prompts sent before the simplified plan is tried
    pub const MAX_CORRECTION_ATTEMPTS: u32 = 4;

    /// Output cap for one correction reply
    pub const CORRECTION_MAX_TOKENS: u32 = 8000;
}

/// Structural limits a generated plan must meet
pub mod plan_rules {
    /// Days every week plan covers, keyed `day1` to `day7`
    pub const DAYS_PER_WEEK: usize = 7;

    /// Fewest meals allowed in a day
    pub const MIN_MEALS_PER_DAY: usize = 1;

    /// Most meals allowed in a day
    pub const MAX_MEALS_PER_DAY: usize = 5;

    /// A day below this total is rejected
    pub const MIN_DAILY_CALORIES: i64 = 800;

    /// Minimum entries in `recommendations` and in `forbidden`
    pub const MIN_FOOD_LIST_LEN: usize = 3;

    /// Weight-loss plans above this daily total are rejected
    pub const MAX_WEIGHT_LOSS_CALORIES: i64 = 3000;

    /// Meal types in the order they may appear within a day
    pub const MEAL_ORDER: &[&str] = &[
        "Закуска",
        "Обяд",
        "Следобедна закуска",
        "Вечеря",
        "Късна закуска",
    ];
}

/// Fixed user-facing messages (Bulgarian, matching the product locale)
pub mod messages {
    /// Substituted when a malformed directive leaves no printable reply
    pub const PARSE_FAILURE: &str =
        "Имаше проблем с обработката на отговора. Моля опитайте отново.";

    /// Fallback for a missing goal inside the modification instructions
    pub const DEFAULT_GOAL: &str = "твоята цел";

    /// Placeholder used in prompts when a value is unknown
    pub const NOT_SPECIFIED: &str = "няма";

    /// Dietary modifier attached to single-shot fallback plans
    pub const FALLBACK_DIETARY_MODIFIER: &str = "Балансирано";

    /// Diet type attached to single-shot fallback plans
    pub const FALLBACK_DIET_TYPE: &str = "Балансирана";
}

/// Known plan modification keywords and their prompt descriptions
pub mod modifications {
    /// No snacks between main meals
    pub const NO_INTERMEDIATE_MEALS: &str = "no_intermediate_meals";
    /// Exactly three meals per day
    pub const THREE_MEALS_PER_DAY: &str = "3_meals_per_day";
    /// Four meals per day
    pub const FOUR_MEALS_PER_DAY: &str = "4_meals_per_day";
    /// No meat or fish
    pub const VEGETARIAN: &str = "vegetarian";
    /// No dairy products
    pub const NO_DAIRY: &str = "no_dairy";
    /// Reduced carbohydrates
    pub const LOW_CARB: &str = "low_carb";
    /// Increased protein intake
    pub const INCREASE_PROTEIN: &str = "increase_protein";

    /// Prompt description for every known keyword
    pub const DESCRIPTIONS: &[(&str, &str)] = &[
        (
            NO_INTERMEDIATE_MEALS,
            "БЕЗ междинни хранения/закуски - само основни хранения (закуска, обяд, вечеря)",
        ),
        (
            THREE_MEALS_PER_DAY,
            "Точно 3 хранения на ден (закуска, обяд, вечеря)",
        ),
        (
            FOUR_MEALS_PER_DAY,
            "4 хранения на ден (закуска, обяд, следобедна закуска, вечеря)",
        ),
        (VEGETARIAN, "ВЕГЕТАРИАНСКО хранене - без месо и риба"),
        (NO_DAIRY, "БЕЗ млечни продукти"),
        (LOW_CARB, "Нисковъглехидратна диета"),
        (INCREASE_PROTEIN, "Повишен прием на протеини"),
    ];

    /// Look up the prompt description of a known keyword
    #[must_use]
    pub fn describe(keyword: &str) -> Option<&'static str> {
        DESCRIPTIONS
            .iter()
            .find(|(key, _)| *key == keyword)
            .map(|(_, description)| *description)
    }
}

/// Strategy fields that are stripped before a plan leaves the service
pub mod internal_fields {
    /// Fields removed from the strategy record of a returned plan
    pub const STRATEGY_INTERNAL_FIELDS: &[&str] = &[
        "longTermStrategy",
        "mealCountJustification",
        "afterDinnerMealJustification",
    ];
}

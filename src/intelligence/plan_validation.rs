// ABOUTME: Deterministic quality checks a generated meal plan must pass before it reaches the client
// ABOUTME: Reports every problem as a Bulgarian sentence the correction prompt can quote back to the model
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

//! # Plan Quality Validation
//!
//! The model is free to return any JSON object for the plan stage, so the
//! composite plan is checked against structural and medical rules before it
//! is accepted. Each failed rule yields one human-readable error; an empty
//! list means the plan is valid.
//!
//! Field presence follows loose semantics: `null`, `false`, `0` and `""`
//! count as missing, while empty arrays and objects count as present.
//! Numeric fields are read from their leading integer, so `"450 kcal"` is 450
//! and unreadable values are 0.

use aidiet_core::constants::plan_rules::{
    DAYS_PER_WEEK, MAX_MEALS_PER_DAY, MAX_WEIGHT_LOSS_CALORIES, MEAL_ORDER, MIN_DAILY_CALORIES,
    MIN_FOOD_LIST_LEN, MIN_MEALS_PER_DAY,
};
use aidiet_core::models::{PlanResult, UserProfile};
use serde_json::{Map, Value};

use super::GoalDirection;

const DINNER: &str = "Вечеря";
const AFTERNOON_SNACK: &str = "Следобедна закуска";
const LATE_SNACK: &str = "Късна закуска";
const NO_JUSTIFICATION: &str = "Не са необходими";
const HIGH_CARB_MARKER: &str = "високовъглехидратно";

/// Outcome of [`validate_plan`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanValidation {
    /// One sentence per failed rule, in check order
    pub errors: Vec<String>,
}

impl PlanValidation {
    /// No rule failed
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check `plan` against the structural rules and the client's medical picture
#[must_use]
pub fn validate_plan(plan: &PlanResult, profile: &UserProfile) -> PlanValidation {
    let mut errors = Vec::new();

    if !is_present(plan.analysis.get("keyProblems")) {
        errors.push("Липсва задълбочен анализ".to_owned());
    }
    if !is_present(plan.strategy.get("dietaryModifier")) {
        errors.push("Липсва диетична стратегия".to_owned());
    }

    match plan.fields.get("weekPlan").filter(|week| is_present(Some(*week))) {
        None => errors.push("Липсва седмичен план".to_owned()),
        Some(week) => check_week(week, &plan.strategy, &mut errors),
    }

    if list_len(plan.fields.get("recommendations")) < MIN_FOOD_LIST_LEN {
        errors.push("Липсват препоръчителни храни".to_owned());
    }
    if list_len(plan.fields.get("forbidden")) < MIN_FOOD_LIST_LEN {
        errors.push("Липсват забранени храни".to_owned());
    }

    check_goal_alignment(plan, profile, &mut errors);
    check_medical_alignment(plan, profile, &mut errors);

    PlanValidation { errors }
}

// ============================================================================
// Week structure
// ============================================================================

fn check_week(week: &Value, strategy: &Value, errors: &mut Vec<String>) {
    let empty = Map::new();
    let days = week.as_object().unwrap_or(&empty);

    let day_count = days.keys().filter(|key| key.starts_with("day")).count();
    if day_count < DAYS_PER_WEEK {
        errors.push(format!(
            "Липсват дни от седмицата (генерирани само {day_count} от {DAYS_PER_WEEK})"
        ));
    }

    let after_dinner_justified = strategy
        .get("afterDinnerMealJustification")
        .filter(|value| is_present(Some(*value)))
        .is_some_and(|value| value.as_str() != Some(NO_JUSTIFICATION));

    for index in 1..=DAYS_PER_WEEK {
        let meals = days
            .get(&format!("day{index}"))
            .and_then(|day| day.get("meals"))
            .and_then(Value::as_array)
            .filter(|meals| !meals.is_empty());
        match meals {
            None => errors.push(format!("Ден {index} няма хранения")),
            Some(meals) => check_day(index, meals, after_dinner_justified, errors),
        }
    }
}

fn check_day(index: usize, meals: &[Value], after_dinner_justified: bool, errors: &mut Vec<String>) {
    if !(MIN_MEALS_PER_DAY..=MAX_MEALS_PER_DAY).contains(&meals.len()) {
        errors.push(format!(
            "Ден {index} има {} хранения - трябва да е между {MIN_MEALS_PER_DAY} и {MAX_MEALS_PER_DAY}",
            meals.len()
        ));
    }

    let without_macros = meals.iter().filter(|meal| !has_macros(meal)).count();
    if without_macros > 0 {
        errors.push(format!(
            "Ден {index} има {without_macros} хранения без макронутриенти"
        ));
    }

    let calories: i64 = meals
        .iter()
        .map(|meal| leading_int(meal.get("calories")))
        .sum();
    if calories < MIN_DAILY_CALORIES {
        errors.push(format!("Ден {index} има само {calories} калории - твърде малко"));
    }

    let types: Vec<&str> = meals
        .iter()
        .map(|meal| meal.get("type").and_then(Value::as_str).unwrap_or_default())
        .collect();
    check_meal_types(index, &types, after_dinner_justified, errors);
}

fn check_meal_types(
    index: usize,
    types: &[&str],
    after_dinner_justified: bool,
    errors: &mut Vec<String>,
) {
    if let Some(dinner) = types.iter().position(|kind| *kind == DINNER) {
        let after = &types[dinner + 1..];
        let lone_late_snack = after.len() == 1 && after[0] == LATE_SNACK;
        if !after.is_empty() && !after_dinner_justified && !lone_late_snack {
            errors.push(format!(
                "Ден {index}: Има хранения след вечеря ({}) без обосновка в strategy.afterDinnerMealJustification",
                after.join(", ")
            ));
        }
    }

    for (position, kind) in types.iter().enumerate() {
        if !MEAL_ORDER.contains(kind) {
            errors.push(format!(
                "Ден {index}, хранене {}: Невалиден тип \"{kind}\" - разрешени са само: {}",
                position + 1,
                MEAL_ORDER.join(", ")
            ));
        }
    }

    let mut latest: Option<usize> = None;
    for kind in types {
        if let Some(rank) = MEAL_ORDER.iter().position(|known| known == kind) {
            if latest.is_some_and(|previous| rank < previous) {
                errors.push(format!(
                    "Ден {index}: Неправилен хронологичен ред - \"{kind}\" след по-късно хранене"
                ));
            }
            latest = Some(rank);
        }
    }

    for snack in [AFTERNOON_SNACK, LATE_SNACK] {
        let count = types.iter().filter(|kind| **kind == snack).count();
        if count > 1 {
            errors.push(format!(
                "Ден {index}: Повече от 1 {} ({count}) - разрешена е максимум 1",
                snack.to_lowercase()
            ));
        }
    }
}

// ============================================================================
// Client alignment
// ============================================================================

fn check_goal_alignment(plan: &PlanResult, profile: &UserProfile, errors: &mut Vec<String>) {
    let loses_weight = profile
        .goal
        .as_deref()
        .is_some_and(|goal| GoalDirection::classify(goal) == GoalDirection::WeightLoss);
    if !loses_weight {
        return;
    }
    let daily = plan
        .fields
        .get("summary")
        .and_then(|summary| summary.get("dailyCalories"))
        .and_then(first_number);
    if daily.is_some_and(|calories| calories > MAX_WEIGHT_LOSS_CALORIES) {
        errors.push("Калориите са твърде високи за цел отслабване".to_owned());
    }
}

fn check_medical_alignment(plan: &PlanResult, profile: &UserProfile, errors: &mut Vec<String>) {
    let has_condition = |name: &str| profile.medical_conditions.iter().any(|c| c == name);

    if has_condition("Диабет") {
        let modifier = plan
            .strategy
            .get("dietaryModifier")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase();
        if modifier.contains(HIGH_CARB_MARKER) {
            errors.push(
                "Планът съдържа високовъглехидратна диета, неподходяща при диабет".to_owned(),
            );
        }
    }

    let plant_based = profile
        .diet_preference
        .iter()
        .any(|preference| preference.contains("Вегетарианска") || preference.contains("Веган"));
    if has_condition("Анемия") && plant_based {
        let iron = plan
            .fields
            .get("supplements")
            .and_then(Value::as_array)
            .is_some_and(|supplements| {
                supplements
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_lowercase)
                    .any(|text| text.contains("желязо") || text.contains("iron"))
            });
        if !iron {
            errors.push(
                "При анемия и вегетарианска/веган диета е задължителна добавка с желязо".to_owned(),
            );
        }
    }
}

// ============================================================================
// Value helpers
// ============================================================================

/// Loose presence test; empty containers count as present
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

fn has_macros(meal: &Value) -> bool {
    meal.get("macros").is_some_and(|macros| {
        ["protein", "carbs", "fats"]
            .iter()
            .all(|key| is_present(macros.get(*key)))
    })
}

fn list_len(value: Option<&Value>) -> usize {
    value.and_then(Value::as_array).map_or(0, Vec::len)
}

/// Integer prefix of a number or numeric string, 0 when there is none
fn leading_int(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|n| n.is_finite()).map(|n| n.trunc() as i64))
            .unwrap_or(0),
        Some(Value::String(text)) => {
            let text = text.trim_start();
            let (sign, digits) = match text.strip_prefix('-') {
                Some(rest) => (-1, rest),
                None => (1, text.strip_prefix('+').unwrap_or(text)),
            };
            let digits: String = digits.chars().take_while(char::is_ascii_digit).collect();
            digits.parse::<i64>().map_or(0, |n| sign * n)
        }
        _ => 0,
    }
}

/// First run of digits anywhere in the value, as in `"около 1800 kcal"`
fn first_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_f64().map(|n| n.trunc() as i64),
        Value::String(text) => {
            let digits: String = text
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(char::is_ascii_digit)
                .collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

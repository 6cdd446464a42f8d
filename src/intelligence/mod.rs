// ABOUTME: Intelligence module with deterministic calculations used around model calls
// ABOUTME: Token estimation, nutrition formulas, and plan quality checks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

//! # Intelligence Module
//!
//! Pure, side-effect free calculations. Nothing here calls the model.

/// Mifflin-St Jeor BMR, TDEE, BMI, and goal contradiction screening
pub mod nutrition_calculator;
/// Structural and medical quality checks for generated plans
pub mod plan_validation;
/// Script-aware token cost estimation
pub mod token_estimator;

pub use nutrition_calculator::{
    calculate_bmi, calculate_bmr, calculate_tdee, detect_goal_contradiction, energy_targets,
    recommended_calories, ActivityLevel, ContradictionKind, EnergyTargets, Gender, GoalContradiction,
    GoalDirection,
};
pub use plan_validation::{validate_plan, PlanValidation};
pub use token_estimator::{estimate_optional_tokens, estimate_tokens};

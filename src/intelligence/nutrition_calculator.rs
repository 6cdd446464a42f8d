// ABOUTME: Nutrition calculation algorithms using peer-reviewed scientific formulas
// ABOUTME: BMR, TDEE, BMI, goal calorie targets, and goal contradiction screening
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

//! Nutrition Calculator Module
//!
//! Energy estimates feed the single-shot fallback prompt, and the
//! contradiction screen runs before any plan is generated.
//!
//! # Scientific References
//!
//! - Mifflin, M.D., et al. (1990). A new predictive equation for resting energy expenditure.
//!   *American Journal of Clinical Nutrition*, 51(2), 241-247.
//!   <https://doi.org/10.1093/ajcn/51.2.241>
//!
//! - `McArdle` et al. (2010). Exercise Physiology (activity factors).

use aidiet_core::models::UserProfile;
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// Activity factor applied when the activity label is not recognized
pub const DEFAULT_ACTIVITY_FACTOR: f64 = 1.4;

/// Calorie multiplier for weight-loss goals
pub const WEIGHT_LOSS_FACTOR: f64 = 0.85;

/// Calorie multiplier for muscle-gain goals
pub const MUSCLE_GAIN_FACTOR: f64 = 1.1;

/// Gender for BMR calculations
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Gender {
    /// Male gender (higher BMR)
    Male,
    /// Female gender (lower BMR)
    Female,
}

impl Gender {
    /// Parse the questionnaire label
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Мъж" => Some(Self::Male),
            "Жена" => Some(Self::Female),
            _ => None,
        }
    }

    /// Mifflin-St Jeor gender constant
    #[must_use]
    pub const fn msj_constant(&self) -> f64 {
        match self {
            Self::Male => 5.0,
            Self::Female => -161.0,
        }
    }
}

/// Activity level for TDEE calculation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActivityLevel {
    /// Sedentary (no training days)
    Sedentary,
    /// Lightly active (1-2 days/week)
    LightlyActive,
    /// Moderately active (2-4 days/week)
    ModeratelyActive,
    /// Very active (5-7 days/week)
    VeryActive,
    /// Extra active (athletes)
    ExtraActive,
}

impl ActivityLevel {
    /// Parse the questionnaire's weekly activity label
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Никаква (0 дни седмично)" => Some(Self::Sedentary),
            "Ниска (1–2 дни седмично)" => Some(Self::LightlyActive),
            "Средна (2–4 дни седмично)" => Some(Self::ModeratelyActive),
            "Висока (5–7 дни седмично)" => Some(Self::VeryActive),
            "Много висока (атлети)" => Some(Self::ExtraActive),
            _ => None,
        }
    }

    /// TDEE multiplier for this level
    #[must_use]
    pub const fn factor(&self) -> f64 {
        match self {
            Self::Sedentary => 1.2,
            Self::LightlyActive => 1.375,
            Self::ModeratelyActive => 1.55,
            Self::VeryActive => 1.725,
            Self::ExtraActive => 1.9,
        }
    }
}

/// Direction of the client's stated goal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GoalDirection {
    /// Goal mentions weight loss
    WeightLoss,
    /// Goal mentions muscle gain
    MuscleGain,
    /// Anything else
    Other,
}

impl GoalDirection {
    /// Classify free-text goal by keyword
    #[must_use]
    pub fn classify(goal: &str) -> Self {
        let goal = goal.trim().to_lowercase();
        if goal.contains("отслабване") {
            Self::WeightLoss
        } else if goal.contains("мускулна маса") {
            Self::MuscleGain
        } else {
            Self::Other
        }
    }
}

/// Energy figures derived from the profile
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnergyTargets {
    /// Basal metabolic rate (kcal/day)
    pub bmr: u32,
    /// Total daily energy expenditure (kcal/day)
    pub tdee: u32,
    /// Goal-adjusted daily intake (kcal/day)
    pub recommended_calories: u32,
}

/// Calculate Basal Metabolic Rate using Mifflin-St Jeor, rounded to whole kcal
///
/// Formula: BMR = 10 x weight(kg) + 6.25 x height(cm) - 5 x age + s,
/// with s = +5 for men and -161 for women.
///
/// # Errors
///
/// Returns an error if weight, height, age or gender is missing or invalid
pub fn calculate_bmr(profile: &UserProfile) -> AppResult<u32> {
    let (Some(weight), Some(height), Some(age)) = (
        profile.weight_value(),
        profile.height_value(),
        profile.age_value(),
    ) else {
        return Err(AppError::invalid_input(
            "Cannot calculate BMR: weight, height and age must be numeric",
        ));
    };
    if weight <= 0.0 || height <= 0.0 || age <= 0.0 {
        return Err(AppError::invalid_input(
            "Cannot calculate BMR: weight, height and age must be positive",
        ));
    }
    let gender = profile
        .gender
        .as_deref()
        .and_then(Gender::from_label)
        .ok_or_else(|| {
            AppError::invalid_input("Cannot calculate BMR: gender must be \"Мъж\" or \"Жена\"")
        })?;

    let bmr = 6.25f64.mul_add(height, 10.0 * weight) - 5.0 * age + gender.msj_constant();
    if bmr <= 0.0 {
        return Err(AppError::invalid_input(
            "Cannot calculate BMR: inputs produce a non-positive value",
        ));
    }
    Ok(bmr.round() as u32)
}

/// Calculate Total Daily Energy Expenditure, rounded to whole kcal
///
/// Unrecognized activity labels use [`DEFAULT_ACTIVITY_FACTOR`].
#[must_use]
pub fn calculate_tdee(bmr: u32, activity_label: Option<&str>) -> u32 {
    let factor = activity_label
        .and_then(ActivityLevel::from_label)
        .map_or(DEFAULT_ACTIVITY_FACTOR, |level| level.factor());
    (f64::from(bmr) * factor).round() as u32
}

/// Goal-adjusted daily calorie target
#[must_use]
pub fn recommended_calories(tdee: u32, goal: Option<&str>) -> u32 {
    let factor = match goal.map_or(GoalDirection::Other, GoalDirection::classify) {
        GoalDirection::WeightLoss => WEIGHT_LOSS_FACTOR,
        GoalDirection::MuscleGain => MUSCLE_GAIN_FACTOR,
        GoalDirection::Other => return tdee,
    };
    (f64::from(tdee) * factor).round() as u32
}

/// BMR, TDEE and calorie target in one pass
///
/// # Errors
///
/// Returns an error when BMR cannot be calculated
pub fn energy_targets(profile: &UserProfile) -> AppResult<EnergyTargets> {
    let bmr = calculate_bmr(profile)?;
    let tdee = calculate_tdee(bmr, profile.sport_activity.as_deref());
    Ok(EnergyTargets {
        bmr,
        tdee,
        recommended_calories: recommended_calories(tdee, profile.goal.as_deref()),
    })
}

/// Body mass index, or `None` when weight or height is missing
#[must_use]
pub fn calculate_bmi(profile: &UserProfile) -> Option<f64> {
    let weight = profile.weight_value()?;
    let height_m = profile.height_value()? / 100.0;
    (height_m > 0.0).then(|| weight / (height_m * height_m))
}

/// Kind of conflict between a goal and the client's health picture
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContradictionKind {
    /// Underweight client asking to lose weight
    UnderweightLoss,
    /// Obese client asking to gain muscle mass
    OverweightGain,
    /// Anaemia combined with a plant-based diet
    AnemiaPlantBased,
    /// Under six hours of sleep combined with a muscle-gain goal
    SleepDeficitMuscleGain,
}

/// Warning returned instead of a plan when the goal is unsafe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoalContradiction {
    /// Conflict kind
    #[serde(rename = "type")]
    pub kind: ContradictionKind,
    /// BMI formatted to one decimal
    pub bmi: String,
    /// Client's current category
    pub current_category: String,
    /// Goal as the client wrote it
    pub goal_category: String,
    /// Health risks of pursuing the goal as stated
    pub risks: Vec<String>,
    /// What the client should do instead
    pub recommendation: String,
}

/// Screen the profile for a goal that conflicts with the client's health
///
/// Body-composition conflicts take precedence over medical and lifestyle
/// ones. Returns `None` when BMI or goal is unavailable.
#[must_use]
pub fn detect_goal_contradiction(profile: &UserProfile) -> Option<GoalContradiction> {
    let bmi = calculate_bmi(profile)?;
    let goal = profile.goal.as_deref().filter(|g| !g.trim().is_empty())?;
    let direction = GoalDirection::classify(goal);

    let body_composition = match direction {
        GoalDirection::WeightLoss if bmi < 18.5 => Some(underweight_loss(bmi)),
        GoalDirection::MuscleGain if bmi >= 30.0 => Some(overweight_gain(bmi)),
        _ => None,
    };

    let build = |(kind, current_category, risks, recommendation): ContradictionParts| {
        GoalContradiction {
            kind,
            bmi: format!("{bmi:.1}"),
            current_category,
            goal_category: goal.to_owned(),
            risks: risks.iter().map(|r| (*r).to_owned()).collect(),
            recommendation,
        }
    };

    body_composition
        .or_else(|| anemia_plant_based(profile))
        .or_else(|| sleep_deficit(profile, direction))
        .map(build)
}

type ContradictionParts = (ContradictionKind, String, &'static [&'static str], String);

fn underweight_loss(bmi: f64) -> ContradictionParts {
    let category = if bmi < 16.0 {
        "Значително поднормено тегло"
    } else {
        "Поднормено тегло"
    };
    (
        ContradictionKind::UnderweightLoss,
        category.to_owned(),
        &[
            "Недохранване и дефицит на важни хранителни вещества",
            "Отслабване на имунната система",
            "Загуба на мускулна маса и костна плътност",
            "Хормонален дисбаланс",
        ],
        "При вашето текущо тегло целта за отслабване е медицински неподходяща. \
         Препоръчваме консултация с лекар и балансирано хранене за достигане на здравословно тегло."
            .to_owned(),
    )
}

fn overweight_gain(bmi: f64) -> ContradictionParts {
    let category = if bmi >= 35.0 {
        "Значително наднормено тегло (клас II затлъстяване)"
    } else {
        "Наднормено тегло (затлъстяване)"
    };
    (
        ContradictionKind::OverweightGain,
        category.to_owned(),
        &[
            "Повишен риск от сърдечносъдови заболявания",
            "Диабет тип 2",
            "Хипертония и метаболитни нарушения",
            "Ставни проблеми и намалена подвижност",
        ],
        "При вашето текущо тегло целта за покачване на тегло е медицински неподходяща. \
         Първо постигнете здравословно тегло чрез контролирано отслабване."
            .to_owned(),
    )
}

fn anemia_plant_based(profile: &UserProfile) -> Option<ContradictionParts> {
    let anemic = profile.medical_conditions.iter().any(|c| c == "Анемия");
    let plant_based = profile
        .diet_preference
        .iter()
        .any(|p| p == "Вегетарианска" || p == "Веган");
    (anemic && plant_based).then(|| {
        (
            ContradictionKind::AnemiaPlantBased,
            "Анемия".to_owned(),
            &[
                "Влошаване на анемията поради ниско усвояване на растително желязо",
                "Хронична умора и отслабване",
                "Имунна дисфункция",
            ][..],
            "При анемия и растителна диета е необходимо осигуряване на желязо чрез добавки \
             и медицинско наблюдение на нивата му."
                .to_owned(),
        )
    })
}

fn sleep_deficit(profile: &UserProfile, direction: GoalDirection) -> Option<ContradictionParts> {
    let hours = profile.sleep_hours_value()?;
    (hours < 6.0 && direction == GoalDirection::MuscleGain).then(|| {
        (
            ContradictionKind::SleepDeficitMuscleGain,
            format!("Недостатъчен сън ({hours}ч)"),
            &[
                "Невъзможност за мускулно възстановяване и растеж",
                "Повишен кортизол води до разграждане на мускулна тъкан",
                "Риск от претренираност и травми",
            ][..],
            format!(
                "При {hours} часа сън на нощ мускулният растеж е силно затруднен. \
                 Първо оптимизирайте съня до 7-8 часа."
            ),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile(value: serde_json::Value) -> UserProfile {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_bmr_male() {
        // 10*80 + 6.25*180 - 5*30 + 5 = 1780
        let p = profile(json!({"weight": 80, "height": 180, "age": 30, "gender": "Мъж"}));
        assert_eq!(calculate_bmr(&p).unwrap(), 1780);
    }

    #[test]
    fn test_bmr_female_from_strings() {
        // 10*60 + 6.25*165 - 5*25 - 161 = 1345.25
        let p = profile(json!({"weight": "60", "height": "165", "age": "25", "gender": "Жена"}));
        assert_eq!(calculate_bmr(&p).unwrap(), 1345);
    }

    #[test]
    fn test_bmr_requires_gender() {
        let p = profile(json!({"weight": 60, "height": 165, "age": 25}));
        assert!(calculate_bmr(&p).is_err());
    }

    #[test]
    fn test_tdee_factors() {
        assert_eq!(calculate_tdee(1000, Some("Средна (2–4 дни седмично)")), 1550);
        assert_eq!(calculate_tdee(1000, Some("непознато")), 1400);
        assert_eq!(calculate_tdee(1000, None), 1400);
    }

    #[test]
    fn test_recommended_calories_by_goal() {
        assert_eq!(recommended_calories(2000, Some("Отслабване")), 1700);
        assert_eq!(recommended_calories(2000, Some("Покачване на мускулна маса")), 2200);
        assert_eq!(recommended_calories(2000, Some("Поддържане")), 2000);
    }

    #[test]
    fn test_underweight_loss_contradiction() {
        let p = profile(json!({"weight": 45, "height": 175, "goal": "Отслабване"}));
        let warning = detect_goal_contradiction(&p).unwrap();
        assert_eq!(warning.kind, ContradictionKind::UnderweightLoss);
        assert_eq!(warning.bmi, "14.7");
        assert_eq!(warning.goal_category, "Отслабване");
    }

    #[test]
    fn test_obese_muscle_gain_contradiction() {
        let p = profile(json!({"weight": 120, "height": 175, "goal": "Мускулна маса"}));
        let warning = detect_goal_contradiction(&p).unwrap();
        assert_eq!(warning.kind, ContradictionKind::OverweightGain);
    }

    #[test]
    fn test_anemia_plant_based_contradiction() {
        let p = profile(json!({
            "weight": 60, "height": 170, "goal": "Поддържане",
            "medicalConditions": ["Анемия"], "dietPreference": ["Веган"]
        }));
        let warning = detect_goal_contradiction(&p).unwrap();
        assert_eq!(warning.kind, ContradictionKind::AnemiaPlantBased);
    }

    #[test]
    fn test_sleep_deficit_contradiction() {
        let p = profile(json!({
            "weight": 75, "height": 180, "goal": "Мускулна маса", "sleepHours": "5"
        }));
        let warning = detect_goal_contradiction(&p).unwrap();
        assert_eq!(warning.kind, ContradictionKind::SleepDeficitMuscleGain);
    }

    #[test]
    fn test_healthy_profile_has_no_contradiction() {
        let p = profile(json!({"weight": 75, "height": 180, "goal": "Отслабване", "sleepHours": 8}));
        assert!(detect_goal_contradiction(&p).is_none());
        let missing = profile(json!({"goal": "Отслабване"}));
        assert!(detect_goal_contradiction(&missing).is_none());
    }

    #[test]
    fn test_contradiction_serializes_with_type_tag() {
        let p = profile(json!({"weight": 45, "height": 175, "goal": "Отслабване"}));
        let json = serde_json::to_value(detect_goal_contradiction(&p).unwrap()).unwrap();
        assert_eq!(json["type"], "underweight_loss");
        assert!(json["currentCategory"].is_string());
    }
}

// ABOUTME: User profile record and modification directive types
// ABOUTME: Lenient numeric fields and flattened extras keep questionnaire data lossless
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::directives::EXCLUDE_FOOD_PREFIX;

/// Demographic and lifestyle attributes collected by the questionnaire
///
/// Numeric answers arrive either as JSON numbers or as form strings, so they
/// are kept as raw values and read through the `*_value` accessors. Fields the
/// core does not interpret are preserved in `extra` and round-trip unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Contact email, also used as the user id when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Age in years
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<Value>,
    /// Body weight in kilograms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<Value>,
    /// Height in centimetres
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<Value>,
    /// Gender label ("Мъж" or "Жена")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// Free-text goal ("отслабване", "мускулна маса", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    /// Weekly sport activity label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sport_activity: Option<String>,
    /// Average nightly sleep in hours
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_hours: Option<Value>,
    /// Diagnosed medical conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub medical_conditions: Vec<String>,
    /// Preferred diet styles ("Вегетарианска", "Веган", ...)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diet_preference: Vec<String>,
    /// Comma-separated foods to exclude
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diet_dislike: Option<String>,
    /// Comma-separated foods to favour
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diet_love: Option<String>,
    /// Plan modification flags accumulated through chat
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plan_modifications: Vec<String>,
    /// Remaining questionnaire answers, copied through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// Age in years when present and numeric
    #[must_use]
    pub fn age_value(&self) -> Option<f64> {
        numeric(self.age.as_ref())
    }

    /// Weight in kilograms when present and numeric
    #[must_use]
    pub fn weight_value(&self) -> Option<f64> {
        numeric(self.weight.as_ref())
    }

    /// Height in centimetres when present and numeric
    #[must_use]
    pub fn height_value(&self) -> Option<f64> {
        numeric(self.height.as_ref())
    }

    /// Nightly sleep in hours when present and numeric
    #[must_use]
    pub fn sleep_hours_value(&self) -> Option<f64> {
        numeric(self.sleep_hours.as_ref())
    }

    /// Goal text, lowercased and trimmed, or empty
    #[must_use]
    pub fn normalized_goal(&self) -> String {
        self.goal
            .as_deref()
            .map(|goal| goal.trim().to_lowercase())
            .unwrap_or_default()
    }

    /// Excluded foods parsed from the comma-separated `diet_dislike` field
    #[must_use]
    pub fn excluded_foods(&self) -> Vec<String> {
        self.diet_dislike
            .as_deref()
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Read a form value that may be a JSON number or a numeric string
///
/// Empty strings, zero and unparseable text count as absent, matching how
/// the questionnaire treats unanswered fields.
fn numeric(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    }?;
    (parsed.is_finite() && parsed != 0.0).then_some(parsed)
}

/// A single instruction extracted from an embedded directive payload
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModificationDirective {
    /// Named plan flag such as `3_meals_per_day`, kept verbatim
    Flag(String),
    /// Food to leave out of every future plan
    ExcludeFood(String),
}

impl ModificationDirective {
    /// Classify a raw modification string
    ///
    /// Returns `None` for blank input and for an exclusion with no food name;
    /// such entries are skipped rather than failing the merge.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        if let Some(food) = raw.trim_start().strip_prefix(EXCLUDE_FOOD_PREFIX) {
            let food = food.trim();
            return (!food.is_empty()).then(|| Self::ExcludeFood(food.to_owned()));
        }
        (!raw.trim().is_empty()).then(|| Self::Flag(raw.to_owned()))
    }
}

impl fmt::Display for ModificationDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(flag) => f.write_str(flag),
            Self::ExcludeFood(food) => write!(f, "{EXCLUDE_FOOD_PREFIX}{food}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lenient_numeric_fields() {
        let profile: UserProfile = serde_json::from_value(json!({
            "name": "Иван",
            "age": "34",
            "weight": 82.5,
            "height": "180",
            "sleepHours": ""
        }))
        .unwrap();

        assert_eq!(profile.age_value(), Some(34.0));
        assert_eq!(profile.weight_value(), Some(82.5));
        assert_eq!(profile.height_value(), Some(180.0));
        assert_eq!(profile.sleep_hours_value(), None);
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let input = json!({
            "name": "Мария",
            "dietDislike": "лук, чесън",
            "stressLevel": "Висок",
            "waterIntake": 2
        });
        let profile: UserProfile = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(profile.extra.get("stressLevel"), Some(&json!("Висок")));
        assert_eq!(serde_json::to_value(&profile).unwrap(), input);
    }

    #[test]
    fn test_excluded_foods_skip_blanks() {
        let profile = UserProfile {
            diet_dislike: Some(" лук, ,чесън ,".to_owned()),
            ..UserProfile::default()
        };
        assert_eq!(profile.excluded_foods(), vec!["лук", "чесън"]);
    }

    #[test]
    fn test_directive_classification() {
        assert_eq!(
            ModificationDirective::parse("exclude_food:  мед "),
            Some(ModificationDirective::ExcludeFood("мед".to_owned()))
        );
        assert_eq!(
            ModificationDirective::parse("3_meals_per_day"),
            Some(ModificationDirective::Flag("3_meals_per_day".to_owned()))
        );
        assert_eq!(ModificationDirective::parse("exclude_food:   "), None);
        assert_eq!(ModificationDirective::parse("  "), None);
    }
}

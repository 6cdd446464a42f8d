// ABOUTME: Prompt construction for the pipeline stages, plan corrections, and chat invocations
// ABOUTME: Templates are compiled in from markdown and may be replaced through an injected lookup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

//! # Prompts
//!
//! Default templates are loaded at compile time from markdown files so they
//! can be edited without touching code. Operators may replace any of them at
//! runtime through a [`PromptOverrides`] lookup keyed by the `admin_*_prompt`
//! names; the lookup is read-only and injected by the caller.
//!
//! Templates use `{placeholder}` substitution. Object and array values are
//! inserted as pretty-printed JSON, every other value as plain text, and
//! placeholders with no matching variable are left in place.
//!
//! The chat modification instructions carry the literal `[REGENERATE_PLAN:`
//! spelling that the directive scanner looks for.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::OnceLock;

use aidiet_core::constants::messages::{DEFAULT_GOAL, NOT_SPECIFIED};
use aidiet_core::constants::modifications;
use aidiet_core::constants::plan_rules::{MAX_MEALS_PER_DAY, MIN_DAILY_CALORIES, MIN_MEALS_PER_DAY};
use aidiet_core::models::{ChatMode, ExchangeTurn, PlanResult, UserProfile};
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::intelligence::{energy_targets, EnergyTargets};

/// Strings that identify which output contract a prompt asks for
///
/// Each stage template contains exactly one of these. The offline mock
/// provider relies on them to pick a canned reply.
pub mod markers {
    /// Present in the analysis template only
    pub const ANALYSIS_CONTRACT: &str = "ФОРМАТ НА АНАЛИЗА";
    /// Present in the strategy template only
    pub const STRATEGY_CONTRACT: &str = "ФОРМАТ НА СТРАТЕГИЯТА";
    /// Present in the plan and fallback templates
    pub const PLAN_CONTRACT: &str = "7-дневен хранителен план";
    /// Present in the correction template only
    pub const CORRECTION_CONTRACT: &str = "ГРЕШКИ ЗА КОРИГИРАНЕ";
    /// Closing cue of every chat prompt
    pub const CHAT_REPLY_CUE: &str = "АСИСТЕНТ (отговори КРАТКО):";
}

/// Default analysis stage template
pub const ANALYSIS_TEMPLATE: &str = include_str!("templates/analysis.md");
/// Default strategy stage template
pub const STRATEGY_TEMPLATE: &str = include_str!("templates/strategy.md");
/// Default plan stage template
pub const MEAL_PLAN_TEMPLATE: &str = include_str!("templates/meal_plan.md");
/// Default single-shot fallback template
pub const FALLBACK_TEMPLATE: &str = include_str!("templates/fallback.md");
/// Default template asking the model to repair a plan that failed validation
pub const CORRECTION_TEMPLATE: &str = include_str!("templates/correction.md");
/// Default consultation-mode chat instructions
pub const CONSULTATION_INSTRUCTIONS: &str = include_str!("templates/chat_consultation.md");
/// Default modification-mode chat instructions
pub const MODIFICATION_INSTRUCTIONS: &str = include_str!("templates/chat_modification.md");

const CLIENT_FALLBACK_NAME: &str = "клиента";

/// Every prompt the core builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    /// Stage one
    Analysis,
    /// Stage two
    Strategy,
    /// Stage three
    MealPlan,
    /// Simplified single-shot plan
    Fallback,
    /// Repair of a plan that failed validation
    Correction,
    /// Chat instructions, read-only mode
    Consultation,
    /// Chat instructions, plan changes allowed
    Modification,
}

impl PromptKind {
    /// Key under which an operator override is stored
    #[must_use]
    pub const fn override_key(self) -> &'static str {
        match self {
            Self::Analysis => "admin_analysis_prompt",
            Self::Strategy => "admin_strategy_prompt",
            Self::MealPlan => "admin_meal_plan_prompt",
            Self::Fallback => "admin_plan_prompt",
            Self::Correction => "admin_correction_prompt",
            Self::Consultation => "admin_consultation_prompt",
            Self::Modification => "admin_modification_prompt",
        }
    }

    /// Compiled-in template
    #[must_use]
    pub const fn default_template(self) -> &'static str {
        match self {
            Self::Analysis => ANALYSIS_TEMPLATE,
            Self::Strategy => STRATEGY_TEMPLATE,
            Self::MealPlan => MEAL_PLAN_TEMPLATE,
            Self::Fallback => FALLBACK_TEMPLATE,
            Self::Correction => CORRECTION_TEMPLATE,
            Self::Consultation => CONSULTATION_INSTRUCTIONS,
            Self::Modification => MODIFICATION_INSTRUCTIONS,
        }
    }
}

/// Read-only lookup of operator-edited templates
pub trait PromptOverrides: Send + Sync {
    /// Template stored under `key`, if any
    fn get(&self, key: &str) -> Option<String>;
}

/// Lookup that never overrides anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOverrides;

impl PromptOverrides for NoOverrides {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }
}

/// In-memory override table, typically loaded once at startup
#[derive(Debug, Clone, Default)]
pub struct StaticOverrides {
    prompts: HashMap<String, String>,
}

impl StaticOverrides {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the template for `kind`
    #[must_use]
    pub fn with(mut self, kind: PromptKind, template: impl Into<String>) -> Self {
        self.prompts
            .insert(kind.override_key().to_owned(), template.into());
        self
    }
}

impl FromIterator<(String, String)> for StaticOverrides {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            prompts: iter.into_iter().collect(),
        }
    }
}

impl PromptOverrides for StaticOverrides {
    fn get(&self, key: &str) -> Option<String> {
        self.prompts.get(key).cloned()
    }
}

fn placeholder_regex() -> Option<&'static Regex> {
    static PLACEHOLDER: OnceLock<Option<Regex>> = OnceLock::new();
    PLACEHOLDER
        .get_or_init(|| Regex::new(r"\{(\w+)\}").ok())
        .as_ref()
}

/// Substitute `{name}` placeholders from `variables`
///
/// Substituted text is not scanned again, so values containing braces are
/// inserted verbatim.
#[must_use]
pub fn replace_prompt_variables(template: &str, variables: &Map<String, Value>) -> String {
    let Some(re) = placeholder_regex() else {
        return template.to_owned();
    };
    re.replace_all(template, |caps: &Captures<'_>| {
        let whole = caps.get(0).map_or("", |m| m.as_str());
        caps.get(1)
            .and_then(|key| variables.get(key.as_str()))
            .map_or_else(|| whole.to_owned(), render_value)
    })
    .into_owned()
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Object(_) | Value::Array(_) => pretty_json(value),
        other => other.to_string(),
    }
}

fn pretty_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_owned())
}

/// Builds every prompt from the current templates
pub struct PromptBuilder<'a> {
    overrides: &'a dyn PromptOverrides,
}

impl<'a> PromptBuilder<'a> {
    /// Create a builder reading overrides from `overrides`
    #[must_use]
    pub const fn new(overrides: &'a dyn PromptOverrides) -> Self {
        Self { overrides }
    }

    fn template(&self, kind: PromptKind) -> Cow<'static, str> {
        self.overrides
            .get(kind.override_key())
            .filter(|custom| !custom.trim().is_empty())
            .map_or(Cow::Borrowed(kind.default_template()), Cow::Owned)
    }

    fn render(&self, kind: PromptKind, variables: &Map<String, Value>) -> String {
        replace_prompt_variables(&self.template(kind), variables)
    }

    /// Stage one: holistic profile analysis
    #[must_use]
    pub fn analysis_prompt(&self, profile: &UserProfile) -> String {
        self.render(PromptKind::Analysis, &profile_variables(profile))
    }

    /// Stage two: dietary strategy from the profile and a compact analysis
    #[must_use]
    pub fn strategy_prompt(&self, profile: &UserProfile, analysis: &Map<String, Value>) -> String {
        let mut variables = profile_variables(profile);
        variables.insert("analysisData".to_owned(), compact_analysis(analysis));
        self.render(PromptKind::Strategy, &variables)
    }

    /// Stage three: the week plan from profile, analysis, and strategy
    #[must_use]
    pub fn plan_prompt(
        &self,
        profile: &UserProfile,
        analysis: &Map<String, Value>,
        strategy: &Map<String, Value>,
    ) -> String {
        let computed = energy_targets(profile).ok();
        let bmr = analysis
            .get("bmr")
            .and_then(leading_number)
            .or_else(|| computed.map(|targets| targets.bmr));
        let calories = analysis
            .get("recommendedCalories")
            .and_then(leading_number)
            .or_else(|| computed.map(|targets| targets.recommended_calories));

        let mut variables = profile_variables(profile);
        variables.insert("analysisData".to_owned(), Value::Object(analysis.clone()));
        variables.insert("strategyData".to_owned(), Value::Object(strategy.clone()));
        variables.insert("bmr".to_owned(), number_or_unknown(bmr));
        variables.insert("recommendedCalories".to_owned(), number_or_unknown(calories));
        self.render(PromptKind::MealPlan, &variables)
    }

    /// Simplified single-shot plan built from the profile alone
    #[must_use]
    pub fn fallback_prompt(&self, profile: &UserProfile, energy: Option<&EnergyTargets>) -> String {
        let energy_line = energy.map_or_else(
            || "- Енергийни нужди: изчисли по Mifflin-St Jeor".to_owned(),
            |targets| {
                format!(
                    "- BMR: {} kcal, TDEE: {} kcal\n- Целеви калории: {} kcal/ден",
                    targets.bmr, targets.tdee, targets.recommended_calories
                )
            },
        );
        let mut variables = profile_variables(profile);
        variables.insert("energy".to_owned(), Value::String(energy_line));
        self.render(PromptKind::Fallback, &variables)
    }

    /// Repair prompt quoting the failed checks and the plan that failed them
    #[must_use]
    pub fn correction_prompt(
        &self,
        profile: &UserProfile,
        plan: &PlanResult,
        errors: &[String],
    ) -> String {
        let numbered: Vec<String> = errors
            .iter()
            .enumerate()
            .map(|(index, error)| format!("{}. {error}", index + 1))
            .collect();
        let client = json!({
            "name": profile.name,
            "age": profile.age,
            "gender": profile.gender,
            "goal": profile.goal,
            "medicalConditions": profile.medical_conditions,
            "dietPreference": profile.diet_preference,
            "dietDislike": profile.diet_dislike,
            "dietLove": profile.diet_love,
        });

        let mut variables = profile_variables(profile);
        variables.insert("validationErrors".to_owned(), Value::String(numbered.join("\n")));
        variables.insert(
            "currentPlan".to_owned(),
            serde_json::to_value(plan).unwrap_or_else(|_| json!({})),
        );
        variables.insert("clientData".to_owned(), client);
        variables.insert("minMeals".to_owned(), Value::from(MIN_MEALS_PER_DAY));
        variables.insert("maxMeals".to_owned(), Value::from(MAX_MEALS_PER_DAY));
        variables.insert("minDailyCalories".to_owned(), Value::from(MIN_DAILY_CALORIES));
        self.render(PromptKind::Correction, &variables)
    }

    /// Chat prompt for one client message
    ///
    /// `history` must already be windowed; it is rendered as `role: content`
    /// lines and omitted entirely when empty.
    #[must_use]
    pub fn chat_prompt(
        &self,
        message: &str,
        profile: &UserProfile,
        plan: &PlanResult,
        history: &[ExchangeTurn],
        mode: ChatMode,
    ) -> String {
        let instructions = match mode {
            ChatMode::Consultation => self.render(PromptKind::Consultation, &Map::new()),
            ChatMode::Modification => {
                let goal = profile
                    .goal
                    .as_deref()
                    .filter(|goal| !goal.trim().is_empty())
                    .unwrap_or(DEFAULT_GOAL);
                let mut variables = Map::new();
                variables.insert("goal".to_owned(), Value::String(goal.to_owned()));
                self.render(PromptKind::Modification, &variables)
            }
        };

        let mut prompt = format!(
            "Ти си личен диетолог, психолог и здравен асистент за {}.\n\n\
             КЛИЕНТСКИ ПРОФИЛ:\n{}\n\n\
             ПЪЛЕН ХРАНИТЕЛЕН ПЛАН:\n{}\n\n",
            display_name(profile),
            pretty_json(profile),
            pretty_json(plan),
        );
        if !history.is_empty() {
            prompt.push_str("ИСТОРИЯ НА РАЗГОВОРА:\n");
            for turn in history {
                prompt.push_str(turn.role.as_str());
                prompt.push_str(": ");
                prompt.push_str(&turn.content);
                prompt.push('\n');
            }
            prompt.push('\n');
        }
        prompt.push_str(instructions.trim_end());
        prompt.push_str("\n\nКЛИЕНТ: ");
        prompt.push_str(message);
        prompt.push_str("\n\n");
        prompt.push_str(markers::CHAT_REPLY_CUE);
        prompt
    }
}

fn display_name(profile: &UserProfile) -> &str {
    profile
        .name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(CLIENT_FALLBACK_NAME)
}

/// Variables shared by every stage template
fn profile_variables(profile: &UserProfile) -> Map<String, Value> {
    let text_or_unknown = |value: Option<&str>| {
        Value::String(
            value
                .filter(|text| !text.trim().is_empty())
                .unwrap_or(NOT_SPECIFIED)
                .to_owned(),
        )
    };
    let scalar_or_unknown = |value: Option<&Value>| match value {
        Some(Value::Null) | None => Value::String(NOT_SPECIFIED.to_owned()),
        Some(value) => value.clone(),
    };

    let excluded = profile.excluded_foods();
    let medical = if profile.medical_conditions.is_empty() {
        NOT_SPECIFIED.to_owned()
    } else {
        profile.medical_conditions.join(", ")
    };

    let mut variables = Map::new();
    variables.insert(
        "userData".to_owned(),
        serde_json::to_value(profile).unwrap_or_else(|_| json!({})),
    );
    variables.insert(
        "name".to_owned(),
        Value::String(display_name(profile).to_owned()),
    );
    variables.insert("age".to_owned(), scalar_or_unknown(profile.age.as_ref()));
    variables.insert("gender".to_owned(), text_or_unknown(profile.gender.as_deref()));
    variables.insert("goal".to_owned(), text_or_unknown(profile.goal.as_deref()));
    variables.insert("dietLove".to_owned(), text_or_unknown(profile.diet_love.as_deref()));
    variables.insert("medicalConditions".to_owned(), Value::String(medical));
    variables.insert(
        "excludedFoods".to_owned(),
        Value::String(if excluded.is_empty() {
            NOT_SPECIFIED.to_owned()
        } else {
            excluded.join(", ")
        }),
    );
    variables.insert(
        "modifications".to_owned(),
        Value::String(modifications_line(&profile.plan_modifications)),
    );
    variables
}

/// `МОДИФИКАЦИИ:` line for the plan prompts, empty when there are none
///
/// Known keywords are replaced by their description; anything else is
/// passed through as the client phrased it.
fn modifications_line(flags: &[String]) -> String {
    if flags.is_empty() {
        return String::new();
    }
    let rendered: Vec<&str> = flags
        .iter()
        .map(|flag| modifications::describe(flag.trim()).unwrap_or(flag.as_str()))
        .collect();
    format!("МОДИФИКАЦИИ: {}\n", rendered.join("; "))
}

/// Analysis fields the strategy stage needs
fn compact_analysis(analysis: &Map<String, Value>) -> Value {
    const KEPT: &[&str] = &[
        "bmr",
        "tdee",
        "recommendedCalories",
        "macroRatios",
        "metabolicProfile",
        "healthRisks",
        "nutritionalNeeds",
        "psychologicalProfile",
        "successChance",
    ];

    let mut compact: Map<String, Value> = KEPT
        .iter()
        .filter_map(|key| analysis.get(*key).map(|value| ((*key).to_owned(), value.clone())))
        .collect();
    if let Some(Value::Array(problems)) = analysis.get("keyProblems") {
        let problems: Vec<Value> = problems
            .iter()
            .map(|problem| json!({"title": problem.get("title"), "severity": problem.get("severity")}))
            .collect();
        compact.insert("keyProblems".to_owned(), Value::Array(problems));
    }
    if compact.is_empty() {
        return Value::Object(analysis.clone());
    }
    Value::Object(compact)
}

/// Whole-number reading of a model-provided figure such as `1780` or `"1780 (изчислен)"`
fn leading_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number
            .as_f64()
            .filter(|n| n.is_finite() && *n > 0.0)
            .map(|n| n.round() as u32),
        Value::String(text) => {
            let digits: String = text
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(char::is_ascii_digit)
                .collect();
            digits.parse().ok().filter(|n| *n > 0)
        }
        _ => None,
    }
}

fn number_or_unknown(value: Option<u32>) -> Value {
    value.map_or_else(|| Value::String(NOT_SPECIFIED.to_owned()), Value::from)
}

// ABOUTME: Folds chat-requested modifications into the stored profile before regeneration
// ABOUTME: Keeps flag order stable and the comma-joined exclusion list free of duplicates
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

//! # Preference Merger
//!
//! Exclusions land in the profile's `dietDislike` list; every other
//! modification becomes a plan flag. Merging the same list twice yields the
//! same profile.

use std::collections::HashSet;

use aidiet_core::models::{ModificationDirective, PlanResult, UserProfile};
use tracing::{debug, info};

/// Result of merging modifications into a profile
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Profile with flags and exclusions applied
    pub profile: UserProfile,
    /// Directives that were recognized, in request order
    pub applied: Vec<ModificationDirective>,
    /// Raw entries that could not be interpreted
    pub skipped: Vec<String>,
}

/// Ordered set that keeps first-seen order
#[derive(Debug, Default)]
struct OrderedSet {
    seen: HashSet<String>,
    items: Vec<String>,
}

impl OrderedSet {
    fn insert(&mut self, item: String) -> bool {
        if self.seen.contains(&item) {
            return false;
        }
        self.seen.insert(item.clone());
        self.items.push(item);
        true
    }
}

impl FromIterator<String> for OrderedSet {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        let mut set = Self::default();
        for item in iter {
            set.insert(item);
        }
        set
    }
}

/// Merge requested modifications into `profile`
///
/// `current_plan` only affects logging: an exclusion of a food the plan
/// actually serves is reported differently from a preference for future
/// plans. The input profile is not touched.
#[must_use]
pub fn merge_preferences(
    profile: &UserProfile,
    modifications: &[String],
    current_plan: Option<&PlanResult>,
) -> MergeOutcome {
    let mut flags: OrderedSet = profile.plan_modifications.iter().cloned().collect();
    let mut exclusions: OrderedSet = profile.excluded_foods().into_iter().collect();
    let mut applied = Vec::with_capacity(modifications.len());
    let mut skipped = Vec::new();

    for raw in modifications {
        let Some(directive) = ModificationDirective::parse(raw) else {
            debug!(modification = %raw, "Skipping uninterpretable modification");
            skipped.push(raw.clone());
            continue;
        };

        match &directive {
            ModificationDirective::ExcludeFood(food) => {
                // A name containing commas would re-split on the next merge
                for item in food.split(',').map(str::trim).filter(|item| !item.is_empty()) {
                    let in_plan = current_plan.is_some_and(|plan| plan.mentions_food(item));
                    if exclusions.insert(item.to_owned()) {
                        if in_plan {
                            info!(food = %item, "Excluding food present in the current plan");
                        } else {
                            info!(food = %item, "Excluding food from future plans");
                        }
                    }
                }
            }
            ModificationDirective::Flag(flag) => {
                if flags.insert(flag.clone()) {
                    info!(flag = %flag, "Plan modification flag added");
                }
            }
        }
        applied.push(directive);
    }

    let mut merged = profile.clone();
    merged.plan_modifications = flags.items;
    merged.diet_dislike = if exclusions.items.is_empty() && profile.diet_dislike.is_none() {
        None
    } else {
        Some(exclusions.items.join(", "))
    };

    MergeOutcome {
        profile: merged,
        applied,
        skipped,
    }
}

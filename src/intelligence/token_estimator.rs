// ABOUTME: Script-aware approximation of model token cost for arbitrary text
// ABOUTME: Interpolates characters-per-token between Latin and Cyrillic baselines
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

//! Token estimation
//!
//! Cyrillic-heavy text packs fewer characters into each token than Latin
//! text. The estimator measures the Cyrillic share of the input and
//! linearly interpolates the characters-per-token ratio between
//! [`LATIN_CHARS_PER_TOKEN`] and [`CYRILLIC_CHARS_PER_TOKEN`], then divides the
//! character count by it, rounding up.

/// Characters per token for purely Latin text
pub const LATIN_CHARS_PER_TOKEN: f64 = 4.0;

/// Characters per token for purely Cyrillic text
pub const CYRILLIC_CHARS_PER_TOKEN: f64 = 3.0;

/// Whether `c` falls in the Cyrillic block (U+0400..=U+04FF)
const fn is_cyrillic(c: char) -> bool {
    matches!(c, '\u{0400}'..='\u{04FF}')
}

/// Estimate the token cost of `text`
///
/// Returns zero for empty input and a positive count otherwise. For a fixed
/// script mixture the estimate never decreases as the text grows.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    let (total, cyrillic) = text.chars().fold((0_usize, 0_usize), |(total, cyr), c| {
        (total + 1, cyr + usize::from(is_cyrillic(c)))
    });
    if total == 0 {
        return 0;
    }

    let cyrillic_ratio = cyrillic as f64 / total as f64;
    let chars_per_token = LATIN_CHARS_PER_TOKEN
        - (LATIN_CHARS_PER_TOKEN - CYRILLIC_CHARS_PER_TOKEN) * cyrillic_ratio;

    (total as f64 / chars_per_token).ceil() as usize
}

/// Estimate the token cost of an optional text, treating `None` as empty
#[must_use]
pub fn estimate_optional_tokens(text: Option<&str>) -> usize {
    text.map_or(0, estimate_tokens)
}

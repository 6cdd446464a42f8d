// ABOUTME: Lenient extraction of a JSON document from free-form model output
// ABOUTME: Tries fenced blocks, then a balanced scan, then a greedy span, sanitizing each candidate
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

//! # Structured Reply Parsing
//!
//! Generative backends wrap JSON in prose, code fences, or both, and
//! regularly emit trailing or missing commas. [`parse_structured_reply`]
//! tries three candidate regions in order and repairs the common comma
//! mistakes before handing each to `serde_json`. A stage reply is only
//! usable when the result is a JSON object without a top-level `error` key.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// Why a reply could not be turned into a structured document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    /// No `{` or `[` anywhere in the reply
    #[error("no JSON structure found in reply")]
    NoStructure,
    /// Every candidate region failed to parse
    #[error("all JSON parsing attempts failed: {0}")]
    Invalid(String),
    /// Parsed, but the top level is not an object
    #[error("reply is valid JSON but not an object")]
    NotAnObject,
    /// The document reports an error instead of data
    #[error("reply reports an error: {0}")]
    ErrorReported(String),
}

/// Parse a model reply into a JSON object
///
/// # Errors
///
/// Returns a [`ParseFailure`] when no candidate region parses, when the
/// parsed document is not an object, or when it carries a top-level `error`.
pub fn parse_structured_reply(text: &str) -> Result<Map<String, Value>, ParseFailure> {
    match extract_document(text)? {
        Value::Object(map) => {
            if let Some(error) = map.get("error") {
                let reason = error
                    .as_str()
                    .map_or_else(|| error.to_string(), str::to_owned);
                return Err(ParseFailure::ErrorReported(reason));
            }
            Ok(map)
        }
        _ => Err(ParseFailure::NotAnObject),
    }
}

/// Extract the first parseable JSON document from `text`
fn extract_document(text: &str) -> Result<Value, ParseFailure> {
    if let Some(block) = fenced_block_regex()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
    {
        match serde_json::from_str(&sanitize_json(block.as_str())) {
            Ok(value) => return Ok(value),
            Err(e) => debug!(error = %e, "Fenced JSON block did not parse, trying other methods"),
        }
    }

    if let Some(region) = extract_balanced(text) {
        match serde_json::from_str(&sanitize_json(region)) {
            Ok(value) => return Ok(value),
            Err(e) => debug!(error = %e, "Balanced JSON region did not parse, trying greedy span"),
        }
    }

    let greedy = greedy_span_regex()
        .and_then(|re| re.find(text))
        .ok_or(ParseFailure::NoStructure)?;
    serde_json::from_str(&sanitize_json(greedy.as_str())).map_err(|e| {
        warn!(
            error = %e,
            excerpt = %text.chars().take(500).collect::<String>(),
            "All JSON parsing attempts failed"
        );
        ParseFailure::Invalid(e.to_string())
    })
}

/// First balanced `{...}` or `[...]` region, honouring strings and escapes
///
/// The region opens at whichever of `{` or `[` appears first and closes when
/// the counter for that opening delimiter returns to zero.
fn extract_balanced(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let bytes = text.as_bytes();
    let opener = bytes[start];

    let mut braces: i32 = 0;
    let mut brackets: i32 = 0;
    let mut in_string = false;
    let mut escape_pending = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if escape_pending {
            escape_pending = false;
            continue;
        }
        match byte {
            b'\\' => escape_pending = true,
            b'"' => in_string = !in_string,
            _ if in_string => {}
            b'{' => braces += 1,
            b'}' => braces -= 1,
            b'[' => brackets += 1,
            b']' => brackets -= 1,
            _ => {}
        }
        let closed = !in_string
            && match opener {
                b'{' => braces == 0 && byte == b'}',
                _ => brackets == 0 && byte == b']',
            };
        if closed {
            return Some(&text[start..=start + offset]);
        }
    }
    None
}

/// Repair the comma mistakes models make most often
#[must_use]
pub fn sanitize_json(candidate: &str) -> String {
    let Some(rules) = sanitize_rules() else {
        return candidate.to_owned();
    };
    rules
        .iter()
        .fold(candidate.to_owned(), |acc, (re, replacement)| {
            re.replace_all(&acc, *replacement).into_owned()
        })
}

fn fenced_block_regex() -> Option<&'static Regex> {
    static FENCED: OnceLock<Option<Regex>> = OnceLock::new();
    FENCED
        .get_or_init(|| Regex::new(r"```(?:json)?\s*([\[{][\s\S]*?[}\]])\s*```").ok())
        .as_ref()
}

fn greedy_span_regex() -> Option<&'static Regex> {
    static GREEDY: OnceLock<Option<Regex>> = OnceLock::new();
    GREEDY
        .get_or_init(|| Regex::new(r"[\[{][\s\S]*[}\]]").ok())
        .as_ref()
}

fn sanitize_rules() -> Option<&'static [(Regex, &'static str)]> {
    static RULES: OnceLock<Option<Vec<(Regex, &'static str)>>> = OnceLock::new();
    RULES
        .get_or_init(|| {
            [
                // trailing comma before a closer
                (r",(\s*[\}\]])", "${1}"),
                // duplicate commas
                (r",\s*,+", ","),
                // missing comma between adjacent containers
                (r"\}(\s*)\{", "},${1}{"),
                (r"\](\s*)\[", "],${1}["),
                (r"\}(\s*)\[", "},${1}["),
                (r"\](\s*)\{", "],${1}{"),
            ]
            .into_iter()
            .map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
            .collect()
        })
        .as_deref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_object() {
        let map = parse_structured_reply(r#"{"bmr": 1650, "keyProblems": []}"#).unwrap();
        assert_eq!(map["bmr"], 1650);
    }

    #[test]
    fn test_fenced_block_wins_over_prose() {
        let reply = "Ето анализа {не е JSON}:\n```json\n{\"bmr\": 1500}\n```\nБлагодаря!";
        let map = parse_structured_reply(reply).unwrap();
        assert_eq!(Value::Object(map), json!({"bmr": 1500}));
    }

    #[test]
    fn test_balanced_region_ignores_trailing_prose() {
        let reply = r#"Analysis: {"note": "braces } inside [strings]", "x": {"y": 1}} and then {"z": 2}"#;
        let map = parse_structured_reply(reply).unwrap();
        assert_eq!(map["x"]["y"], 1);
        assert!(!map.contains_key("z"));
    }

    #[test]
    fn test_sanitizes_trailing_and_missing_commas() {
        let reply = r#"{"days": [{"a": 1,} {"b": 2},], "tags": ["x",, "y"]}"#;
        let map = parse_structured_reply(reply).unwrap();
        assert_eq!(map["days"], json!([{"a": 1}, {"b": 2}]));
        assert_eq!(map["tags"], json!(["x", "y"]));
    }

    #[test]
    fn test_error_key_is_rejected() {
        let failure = parse_structured_reply(r#"{"error": "quota"}"#).unwrap_err();
        assert_eq!(failure, ParseFailure::ErrorReported("quota".to_owned()));
    }

    #[test]
    fn test_array_is_not_an_object() {
        assert_eq!(
            parse_structured_reply("[1, 2, 3]").unwrap_err(),
            ParseFailure::NotAnObject
        );
    }

    #[test]
    fn test_prose_only() {
        assert_eq!(
            parse_structured_reply("Съжалявам, не мога да помогна.").unwrap_err(),
            ParseFailure::NoStructure
        );
    }

    #[test]
    fn test_truncated_json_is_invalid() {
        let failure = parse_structured_reply(r#"{"weekPlan": {"day1": {"meals": [{"name": "Овесена каша"}]"#).unwrap_err();
        assert!(matches!(failure, ParseFailure::Invalid(_)));
    }
}

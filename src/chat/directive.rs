// ABOUTME: Finite-state scanner that locates sentinel-delimited payloads inside model replies
// ABOUTME: Strips well-formed directives and truncates at malformed ones with a fixed apology
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

//! # Directive Scanner
//!
//! Chat replies may embed a plan-regeneration request of the form
//! `[REGENERATE_PLAN:{"modifications":[...]}]`. Naive search for the next `]`
//! fails because the payload itself contains arrays and quoted strings, so the
//! end is found with a small state machine:
//!
//! - `brace_depth` / `bracket_depth` count `{}` and `[]` seen outside strings
//! - `in_string` flips on every unescaped `"`
//! - `escape_pending` makes the character after a backslash inert
//!
//! A `]` reached outside a string while both depths read zero is the
//! sentinel's own closing bracket. All delimiters are ASCII, so the scan runs
//! over bytes and never splits a multi-byte character.

use aidiet_core::constants::directives::{MODIFICATIONS_KEY, REGENERATE_PLAN_SENTINEL};
use aidiet_core::constants::messages::PARSE_FAILURE;
use serde_json::Value;
use tracing::{debug, warn};

/// Scanner state carried across bytes
#[derive(Debug, Default, Clone, Copy)]
struct ScanState {
    brace_depth: i32,
    bracket_depth: i32,
    in_string: bool,
    escape_pending: bool,
}

/// What a single byte did to the scan
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Continue,
    Closed,
}

impl ScanState {
    fn step(&mut self, byte: u8) -> Step {
        if self.escape_pending {
            self.escape_pending = false;
            return Step::Continue;
        }
        match byte {
            b'\\' => self.escape_pending = true,
            b'"' => self.in_string = !self.in_string,
            _ if self.in_string => {}
            b'{' => self.brace_depth += 1,
            b'}' => self.brace_depth -= 1,
            b'[' => self.bracket_depth += 1,
            b']' if self.brace_depth == 0 && self.bracket_depth == 0 => return Step::Closed,
            b']' => self.bracket_depth -= 1,
            _ => {}
        }
        Step::Continue
    }
}

/// Find the byte offset of the bracket that closes a directive
///
/// `start` is the offset immediately after the sentinel. Returns `None` when
/// the text ends first (typically a truncated generation) or when `start` is
/// out of range. The returned offset points at the closing `]` itself.
#[must_use]
pub fn find_payload_end(text: &str, start: usize) -> Option<usize> {
    let tail = text.as_bytes().get(start..)?;
    let mut state = ScanState::default();
    tail.iter()
        .position(|&byte| state.step(byte) == Step::Closed)
        .map(|offset| start + offset)
}

/// A well-formed payload lifted out of a reply
#[derive(Debug, Clone, PartialEq)]
pub struct DirectivePayload {
    /// Parsed payload document
    pub document: Value,
}

impl DirectivePayload {
    /// String entries of the payload's modification list, in order
    ///
    /// Non-string entries are skipped; a payload without the list yields
    /// nothing.
    #[must_use]
    pub fn modifications(&self) -> Vec<String> {
        self.document
            .get(MODIFICATIONS_KEY)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Outcome of scanning a reply for directives
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveScan {
    /// No sentinel in the reply; text is the reply unchanged
    Absent {
        /// Original reply
        text: String,
    },
    /// Every sentinel closed and parsed; all were stripped from the text
    Extracted {
        /// Reply with the directives removed and surrounding whitespace trimmed
        text: String,
        /// Payloads in reply order
        payloads: Vec<DirectivePayload>,
    },
    /// A sentinel never closed or its payload did not parse
    Malformed {
        /// Reply truncated at the offending sentinel, or the apology if empty
        text: String,
        /// Well-formed payloads that preceded the malformed one
        payloads: Vec<DirectivePayload>,
    },
}

impl DirectiveScan {
    /// Text safe to show the client
    #[must_use]
    pub fn visible_text(&self) -> &str {
        match self {
            Self::Absent { text } | Self::Extracted { text, .. } | Self::Malformed { text, .. } => {
                text
            }
        }
    }

    /// Payloads that parsed successfully
    #[must_use]
    pub fn payloads(&self) -> &[DirectivePayload] {
        match self {
            Self::Absent { .. } => &[],
            Self::Extracted { payloads, .. } | Self::Malformed { payloads, .. } => payloads,
        }
    }

    /// All modification strings across payloads, in reply order
    #[must_use]
    pub fn modifications(&self) -> Vec<String> {
        self.payloads()
            .iter()
            .flat_map(DirectivePayload::modifications)
            .collect()
    }

    /// Whether at least one directive was found and parsed
    #[must_use]
    pub fn has_directive(&self) -> bool {
        !self.payloads().is_empty()
    }
}

/// Scan a model reply for embedded directives
///
/// Well-formed directives are removed wherever they occur. The first
/// malformed one ends the scan: everything from its sentinel onward is
/// dropped, and the fixed apology replaces the reply if nothing printable
/// remains. Never fails; a broken directive only degrades the visible text.
#[must_use]
pub fn scan_reply(reply: &str) -> DirectiveScan {
    if !reply.contains(REGENERATE_PLAN_SENTINEL) {
        return DirectiveScan::Absent {
            text: reply.to_owned(),
        };
    }

    let mut visible = String::with_capacity(reply.len());
    let mut payloads = Vec::new();
    let mut cursor = 0;

    while let Some(relative) = reply[cursor..].find(REGENERATE_PLAN_SENTINEL) {
        let sentinel_at = cursor + relative;
        let payload_start = sentinel_at + REGENERATE_PLAN_SENTINEL.len();
        visible.push_str(&reply[cursor..sentinel_at]);

        match parse_payload(reply, payload_start) {
            Some((payload, end)) => {
                payloads.push(payload);
                cursor = end + 1;
            }
            None => {
                warn!(
                    offset = sentinel_at,
                    tail = %tail_excerpt(reply),
                    "Malformed embedded directive, truncating reply at sentinel"
                );
                let text = visible.trim();
                let text = if text.is_empty() { PARSE_FAILURE } else { text };
                return DirectiveScan::Malformed {
                    text: text.to_owned(),
                    payloads,
                };
            }
        }
    }

    visible.push_str(&reply[cursor..]);
    debug!(count = payloads.len(), "Embedded directives stripped from reply");
    DirectiveScan::Extracted {
        text: visible.trim().to_owned(),
        payloads,
    }
}

/// Drop everything from the first sentinel onward
///
/// Used when a directive was well-formed but acting on it failed. Returns
/// the fixed apology when nothing printable precedes the sentinel.
#[must_use]
pub fn truncate_at_sentinel(reply: &str) -> String {
    let kept = reply
        .find(REGENERATE_PLAN_SENTINEL)
        .map_or(reply, |at| &reply[..at])
        .trim();
    if kept.is_empty() {
        PARSE_FAILURE.to_owned()
    } else {
        kept.to_owned()
    }
}

/// Locate and parse the payload after one sentinel, returning it with its end offset
fn parse_payload(reply: &str, payload_start: usize) -> Option<(DirectivePayload, usize)> {
    let end = find_payload_end(reply, payload_start).filter(|&end| end > payload_start)?;
    match serde_json::from_str::<Value>(&reply[payload_start..end]) {
        Ok(document) => Some((DirectivePayload { document }, end)),
        Err(e) => {
            debug!(error = %e, "Directive payload is not valid JSON");
            None
        }
    }
}

/// Last few hundred characters of a reply for diagnostics
fn tail_excerpt(reply: &str) -> String {
    const EXCERPT_CHARS: usize = 300;
    let count = reply.chars().count();
    reply.chars().skip(count.saturating_sub(EXCERPT_CHARS)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SENTINEL: &str = REGENERATE_PLAN_SENTINEL;

    fn payload_start(text: &str) -> usize {
        text.find(SENTINEL).unwrap() + SENTINEL.len()
    }

    #[test]
    fn test_bracket_inside_string_is_ignored() {
        let text = r#"Добре. [REGENERATE_PLAN:{"modifications":["exclude_food:лук"],"note":"a]b"}] more text"#;
        let start = payload_start(text);
        let end = find_payload_end(text, start).unwrap();

        assert_eq!(&text[end..=end], "]");
        assert_eq!(&text[end - 1..end], "}");
        let payload: Value = serde_json::from_str(&text[start..end]).unwrap();
        assert_eq!(
            payload,
            json!({"modifications": ["exclude_food:лук"], "note": "a]b"})
        );
    }

    #[test]
    fn test_escaped_quote_does_not_toggle_string() {
        let text = r#"[REGENERATE_PLAN:{"note":"say \"]\" loudly"}] tail"#;
        let start = payload_start(text);
        let end = find_payload_end(text, start).unwrap();
        assert_eq!(&text[end + 1..], " tail");
    }

    #[test]
    fn test_escaped_backslash_before_quote_closes_string() {
        let text = r#"[REGENERATE_PLAN:{"path":"C:\\","x":[1]}]!"#;
        let start = payload_start(text);
        let end = find_payload_end(text, start).unwrap();
        assert_eq!(&text[end + 1..], "!");
        assert!(serde_json::from_str::<Value>(&text[start..end]).is_ok());
    }

    #[test]
    fn test_escaped_bracket_inside_string() {
        let text = r#"[REGENERATE_PLAN:{"note":"a\]b"}] rest"#;
        let start = payload_start(text);
        let end = find_payload_end(text, start).unwrap();
        assert_eq!(&text[end + 1..], " rest");
    }

    #[test]
    fn test_nested_arrays_and_objects_are_transparent() {
        let text = r#"[REGENERATE_PLAN:{"a":[[1,2],[{"b":[3]}]],"c":{"d":{}}}]"#;
        let start = payload_start(text);
        let end = find_payload_end(text, start).unwrap();
        assert_eq!(end, text.len() - 1);
    }

    #[test]
    fn test_truncated_payload_is_not_found() {
        let text = r#"[REGENERATE_PLAN:{"modifications":["exclude_food:мед""#;
        assert_eq!(find_payload_end(text, payload_start(text)), None);
    }

    #[test]
    fn test_start_out_of_range() {
        assert_eq!(find_payload_end("abc", 10), None);
    }

    #[test]
    fn test_scan_without_sentinel_is_absent() {
        let scan = scan_reply("Закуската е 350 калории.");
        assert_eq!(
            scan,
            DirectiveScan::Absent {
                text: "Закуската е 350 калории.".to_owned()
            }
        );
        assert!(!scan.has_directive());
    }

    #[test]
    fn test_scan_strips_directive_and_trims() {
        let reply = "✓ Разбрано!\n\n[REGENERATE_PLAN:{\"modifications\":[\"3_meals_per_day\"]}]\n";
        let scan = scan_reply(reply);
        assert_eq!(scan.visible_text(), "✓ Разбрано!");
        assert_eq!(scan.modifications(), vec!["3_meals_per_day"]);
        assert!(matches!(scan, DirectiveScan::Extracted { .. }));
    }

    #[test]
    fn test_scan_strips_every_directive() {
        let reply = r#"A [REGENERATE_PLAN:{"modifications":["vegetarian"]}] B [REGENERATE_PLAN:{"modifications":["exclude_food:мед"]}] C"#;
        let scan = scan_reply(reply);
        assert_eq!(scan.visible_text(), "A  B  C");
        assert_eq!(scan.modifications(), vec!["vegetarian", "exclude_food:мед"]);
        assert!(!scan.visible_text().contains(SENTINEL));
    }

    #[test]
    fn test_unclosed_directive_truncates() {
        let reply = r#"Премахвам меда. [REGENERATE_PLAN:{"modifications":["exclude_food:мед"]"#;
        let scan = scan_reply(reply);
        assert_eq!(scan.visible_text(), "Премахвам меда.");
        assert!(matches!(scan, DirectiveScan::Malformed { .. }));
        assert!(!scan.has_directive());
    }

    #[test]
    fn test_unparseable_payload_truncates() {
        let reply = r#"Готово. [REGENERATE_PLAN:{modifications: oops}] след"#;
        let scan = scan_reply(reply);
        assert_eq!(scan.visible_text(), "Готово.");
        assert!(matches!(scan, DirectiveScan::Malformed { .. }));
    }

    #[test]
    fn test_empty_payload_is_malformed() {
        let scan = scan_reply("[REGENERATE_PLAN:] текст");
        assert_eq!(scan.visible_text(), PARSE_FAILURE);
    }

    #[test]
    fn test_malformed_with_nothing_left_uses_apology() {
        let scan = scan_reply(r#"  [REGENERATE_PLAN:{"modifications":["#);
        assert_eq!(scan.visible_text(), PARSE_FAILURE);
    }

    #[test]
    fn test_truncate_at_sentinel() {
        let reply = r#"Регенерирам плана. [REGENERATE_PLAN:{"modifications":["low_carb"]}] Успех!"#;
        assert_eq!(truncate_at_sentinel(reply), "Регенерирам плана.");
        assert_eq!(truncate_at_sentinel(" [REGENERATE_PLAN:{}]"), PARSE_FAILURE);
        assert_eq!(truncate_at_sentinel("Без промени."), "Без промени.");
    }

    #[test]
    fn test_non_string_modifications_are_skipped() {
        let scan = scan_reply(r#"[REGENERATE_PLAN:{"modifications":["low_carb",7,null,"no_dairy"]}]"#);
        assert_eq!(scan.modifications(), vec!["low_carb", "no_dairy"]);
        assert_eq!(scan.visible_text(), "");
    }
}

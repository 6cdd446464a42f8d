// ABOUTME: Budget-bounded windowing of the conversation exchange log
// ABOUTME: Keeps the newest contiguous run of turns whose estimated cost fits the budget
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 AI Diet Assistant Contributors

use aidiet_core::models::ExchangeTurn;

use crate::intelligence::estimate_tokens;
use crate::logging::AppLogger;

/// Windowed slice of an exchange log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryWindow {
    /// Kept turns, oldest first
    pub turns: Vec<ExchangeTurn>,
    /// Estimated token cost of the kept turns
    pub total_tokens: usize,
}

/// Keep the newest turns whose combined estimated cost fits `budget`
///
/// Walks from newest to oldest and stops at the first turn that would
/// overflow, so the result is always a suffix of `log`. A single turn larger
/// than the budget empties the window.
#[must_use]
pub fn window_history(log: &[ExchangeTurn], budget: usize) -> HistoryWindow {
    let mut total_tokens = 0;
    let mut kept = 0;

    for turn in log.iter().rev() {
        let cost = estimate_tokens(&turn.content);
        if total_tokens + cost > budget {
            break;
        }
        total_tokens += cost;
        kept += 1;
    }

    let window = HistoryWindow {
        turns: log[log.len() - kept..].to_vec(),
        total_tokens,
    };
    if kept < log.len() {
        AppLogger::log_history_window(log.len(), kept, total_tokens);
    }
    window
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(index: usize, chars: usize) -> ExchangeTurn {
        let content = "a".repeat(chars);
        if index % 2 == 0 {
            ExchangeTurn::user(content)
        } else {
            ExchangeTurn::assistant(content)
        }
    }

    #[test]
    fn test_everything_fits() {
        let log: Vec<_> = (0..4).map(|i| turn(i, 40)).collect();
        let window = window_history(&log, 2000);
        assert_eq!(window.turns, log);
        assert_eq!(window.total_tokens, 40);
    }

    #[test]
    fn test_keeps_newest_suffix() {
        // 10 tokens per turn
        let log: Vec<_> = (0..6).map(|i| turn(i, 40)).collect();
        let window = window_history(&log, 35);
        assert_eq!(window.turns, log[3..].to_vec());
        assert_eq!(window.total_tokens, 30);
    }

    #[test]
    fn test_stops_at_first_oversized_turn() {
        let log = vec![turn(0, 4), turn(1, 400), turn(2, 40)];
        let window = window_history(&log, 50);
        // The small oldest turn would fit but is not contiguous with the suffix
        assert_eq!(window.turns, vec![turn(2, 40)]);
    }

    #[test]
    fn test_empty_log_and_zero_budget() {
        assert_eq!(window_history(&[], 100), HistoryWindow::default());
        let log = vec![turn(0, 8)];
        assert!(window_history(&log, 0).turns.is_empty());
    }

    #[test]
    fn test_newest_turn_over_budget_empties_window() {
        let log = vec![turn(0, 4), turn(1, 4000)];
        assert!(window_history(&log, 100).turns.is_empty());
    }
}

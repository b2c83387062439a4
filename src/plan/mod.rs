//! Signals extracted from a task's `task_plan.md`.
//!
//! The plan is free-form Markdown owned by the agent. Only a few
//! conventions are recognized:
//!
//! ```markdown
//! ## Goal
//! Ship the login fix
//!
//! ## Current Phase
//! Phase 2
//!
//! ### Phase 1: Investigate
//! - **Status:** complete
//!
//! - [x] reproduce
//! - [ ] write regression test
//! ```

use regex::Regex;
use std::sync::OnceLock;

const GOAL_MARKER: &str = "## Goal";
const CURRENT_PHASE_MARKER: &str = "## Current Phase";

/// The status token that marks a phase as done.
pub const COMPLETE: &str = "complete";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckboxCounts {
    pub checked: usize,
    pub unchecked: usize,
}

impl CheckboxCounts {
    pub fn total(&self) -> usize {
        self.checked + self.unchecked
    }
}

/// Everything the hooks need to know about a plan, re-derived on each read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanSignal {
    pub goal: Option<String>,
    pub current_phase: Option<String>,
    /// Every `- **Status:** <token>` token, in document order.
    pub phase_statuses: Vec<String>,
    pub checkboxes: CheckboxCounts,
}

fn status_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"-\s*\*\*Status:\*\*\s*(\w+)").expect("valid regex"))
}

fn checkbox_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*[-*]\s+\[([ xX])\]").expect("valid regex"))
}

/// The trimmed line right after the first line equal to `marker`.
fn section_value(lines: &[&str], marker: &str) -> Option<String> {
    let at = lines.iter().position(|line| line.trim_end() == marker)?;
    lines.get(at + 1).map(|value| value.trim().to_string())
}

pub fn parse(plan: &str) -> PlanSignal {
    let lines: Vec<&str> = plan.lines().collect();

    let phase_statuses = status_pattern()
        .captures_iter(plan)
        .map(|caps| caps[1].to_string())
        .collect();

    let mut checkboxes = CheckboxCounts::default();
    for caps in lines.iter().filter_map(|line| checkbox_pattern().captures(line)) {
        if &caps[1] == " " {
            checkboxes.unchecked += 1;
        } else {
            checkboxes.checked += 1;
        }
    }

    PlanSignal {
        goal: section_value(&lines, GOAL_MARKER),
        current_phase: section_value(&lines, CURRENT_PHASE_MARKER),
        phase_statuses,
        checkboxes,
    }
}

/// Truncate `text` to `max` characters, appending `...` when cut.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

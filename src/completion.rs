use crate::plan::{COMPLETE, PlanSignal};
use serde::{Deserialize, Serialize};

/// How a plan records that its phases are done.
///
/// Plans are authored in one of two styles and the two rules are never
/// combined; the workspace preferences pick one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionConvention {
    /// Every `- **Status:** <token>` line reads `complete`.
    #[default]
    StatusTags,
    /// At least one `- [x]` and no `- [ ]`.
    Checkboxes,
}

pub fn is_complete(signal: &PlanSignal, convention: CompletionConvention) -> bool {
    match convention {
        CompletionConvention::StatusTags => {
            !signal.phase_statuses.is_empty()
                && signal.phase_statuses.iter().all(|s| s == COMPLETE)
        }
        CompletionConvention::Checkboxes => {
            signal.checkboxes.total() > 0 && signal.checkboxes.unchecked == 0
        }
    }
}

//! Splits findings for display.

use cbc_core::advice::ABNORMAL_FOLLOW_UP;
use cbc_core::{Finding, FindingSummary};

/// Keep every finding, and copy the non-normal ones into `abnormal`.
pub fn assemble(findings: Vec<Finding>) -> FindingSummary {
    let abnormal = findings
        .iter()
        .filter(|finding| finding.is_abnormal())
        .cloned()
        .collect();
    FindingSummary {
        all: findings,
        abnormal,
    }
}

/// Closing recommendation for summaries with at least one abnormal finding.
pub fn follow_up(summary: &FindingSummary) -> Option<String> {
    if summary.abnormal.is_empty() {
        None
    } else {
        Some(ABNORMAL_FOLLOW_UP.to_string())
    }
}

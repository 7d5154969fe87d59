//! Canned remediation tips for blocked or risky submissions.

use crate::models::{BlockReason, RiskLevel, SecurityVerdict};

const INJECTION_TIPS: &[&str] = &[
    "Describe the content you want analyzed instead of giving instructions to the assistant",
    "Remove phrases that ask the assistant to ignore rules or adopt another role",
];

const TOO_SHORT_TIPS: &[&str] = &[
    "Add more detail so the content meets the platform minimum length",
    "Include context such as audience, goal and key message",
];

const FEW_WORDS_TIPS: &[&str] = &[
    "Write at least a full sentence with several meaningful words",
];

const TROLL_TIPS: &[&str] = &[
    "Submit real content written for your audience",
    "Avoid random characters or repeated letters",
];

const HIGH_RISK_TIPS: &[&str] = &[
    "Remove credentials, code snippets or markup from the content",
];

const MEDIUM_RISK_TIPS: &[&str] = &[
    "Review the warnings and rephrase flagged passages",
];

/// Returns tips for a verdict.
///
/// Lookup order: block reason first, then risk level. A safe verdict yields
/// no tips.
pub fn get_security_recommendations(verdict: &SecurityVerdict) -> Vec<String> {
    let mut tips: Vec<&str> = Vec::new();

    if let Some(reason) = &verdict.reason {
        tips.extend_from_slice(match reason {
            BlockReason::PromptInjection => INJECTION_TIPS,
            BlockReason::ContentTooShort { .. } => TOO_SHORT_TIPS,
            BlockReason::InsufficientWords { .. } => FEW_WORDS_TIPS,
            BlockReason::Trolling => TROLL_TIPS,
        });
    }

    match verdict.risk_level {
        RiskLevel::High if verdict.reason.is_none() => tips.extend_from_slice(HIGH_RISK_TIPS),
        RiskLevel::Medium => tips.extend_from_slice(MEDIUM_RISK_TIPS),
        _ => {}
    }

    tips.into_iter().map(str::to_string).collect()
}

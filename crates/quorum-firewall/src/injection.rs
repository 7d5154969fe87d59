//! Prompt-injection detection.
//!
//! Second stage of the gate. Matches instruction-override phrases and
//! role-play imitation phrases, in English and French. Any match blocks.

use regex::Regex;

use crate::detector::Detector;
use crate::models::{BlockReason, DetectorOutcome, Escalation, RiskLevel};

/// Family a pattern belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionKind {
    /// Attempts to override or leak the system instructions.
    InstructionOverride,
    /// Attempts to make the model imitate another role.
    RolePlay,
}

struct InjectionPattern {
    pattern: Regex,
    kind: InjectionKind,
    description: &'static str,
}

/// Prompt-injection detector.
pub struct InjectionDetector {
    patterns: Vec<InjectionPattern>,
}

impl InjectionDetector {
    /// Creates the detector with the built-in phrase lists.
    pub fn new() -> Self {
        Self {
            patterns: Self::build_patterns(),
        }
    }

    fn build_patterns() -> Vec<InjectionPattern> {
        let specs: &[(&str, InjectionKind, &'static str)] = &[
            (
                r"(?i)ignore\s+(all\s+)?(the\s+|any\s+)?(previous|prior|above|earlier)\s+(instructions?|prompts?|rules?|directions?)",
                InjectionKind::InstructionOverride,
                "Ignore previous instructions",
            ),
            (
                r"(?i)disregard\s+(all\s+)?(your\s+|the\s+)?(previous|prior|above)\s+(instructions?|prompts?|rules?|guidelines?)",
                InjectionKind::InstructionOverride,
                "Disregard instructions",
            ),
            (
                r"(?i)forget\s+(everything|all|your\s+instructions|what\s+you\s+were\s+told)",
                InjectionKind::InstructionOverride,
                "Forget instructions",
            ),
            (
                r"(?i)(new|updated|real)\s+instructions?\s*:",
                InjectionKind::InstructionOverride,
                "Replacement instructions",
            ),
            (
                r"(?i)(show|reveal|display|print|repeat)\s+(me\s+)?(your|the)\s+(system\s+)?prompt",
                InjectionKind::InstructionOverride,
                "System prompt extraction",
            ),
            (
                r"(?i)(ignore|override|bypass|disregard|forget|leak|dump)\s+(your|the)\s+system\s+prompt",
                InjectionKind::InstructionOverride,
                "System prompt override",
            ),
            (
                r"(?i)(jailbreak|developer\s+mode|dan\s+mode|do\s+anything\s+now)",
                InjectionKind::InstructionOverride,
                "Jailbreak keyword",
            ),
            (
                r"(?i)ignore[sz]?\s+(toutes\s+)?(les\s+)?instructions?\s+(pr[ée]c[ée]dentes?|ci-dessus)",
                InjectionKind::InstructionOverride,
                "Ignore previous instructions (fr)",
            ),
            (
                r"(?i)oublie[sz]?\s+(toutes\s+)?(tes|vos|les)\s+instructions",
                InjectionKind::InstructionOverride,
                "Forget instructions (fr)",
            ),
            (
                r"(?i)act\s+as\s+(if|though)",
                InjectionKind::RolePlay,
                "Act as if",
            ),
            (
                r"(?i)pretend\s+(to\s+be|you\s+are|you're)",
                InjectionKind::RolePlay,
                "Pretend to be",
            ),
            (
                r"(?i)(roleplay|role-play)\s+as",
                InjectionKind::RolePlay,
                "Role-play as",
            ),
            (
                r"(?i)you\s+are\s+now\s+(a|an|in)\s+\w+\s+mode",
                InjectionKind::RolePlay,
                "Mode switch",
            ),
            (
                r"(?i)you\s+are\s+no\s+longer\s+(an?\s+)?(ai|assistant|language\s+model)",
                InjectionKind::RolePlay,
                "Identity reassignment",
            ),
            (
                r"(?i)(fais|faites)\s+(comme\s+si|semblant)",
                InjectionKind::RolePlay,
                "Pretend to be (fr)",
            ),
            (
                r"(?i)tu\s+es\s+maintenant\s+",
                InjectionKind::RolePlay,
                "Identity reassignment (fr)",
            ),
        ];

        specs
            .iter()
            .map(|(source, kind, description)| InjectionPattern {
                pattern: Regex::new(source).expect("injection pattern compiles"),
                kind: *kind,
                description: *description,
            })
            .collect()
    }

    /// Returns `(kind, description)` for every pattern that matches.
    pub fn matches(&self, text: &str) -> Vec<(InjectionKind, &'static str)> {
        self.patterns
            .iter()
            .filter(|p| p.pattern.is_match(text))
            .map(|p| (p.kind, p.description))
            .collect()
    }
}

impl Default for InjectionDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for InjectionDetector {
    fn name(&self) -> &'static str {
        "prompt_injection"
    }

    fn inspect(&self, text: &str, _platform: &str) -> DetectorOutcome {
        let found = self.matches(text);
        if found.is_empty() {
            return DetectorOutcome::pass();
        }

        let warnings = found
            .iter()
            .map(|(_, description)| format!("Prompt injection pattern: {}", description))
            .collect();

        DetectorOutcome {
            warnings,
            escalation: Escalation::AtLeast(RiskLevel::High),
            block: Some(BlockReason::PromptInjection),
        }
    }
}

//! Suspicious-content detection.
//!
//! Third stage of the gate. Flags text carrying credentials, shell or SQL
//! payloads, or script-injection markers. Never blocks on its own; it raises
//! the risk one step (low → medium, medium → high).

use regex::Regex;

use crate::detector::Detector;
use crate::models::{DetectorOutcome, Escalation};

/// Category of suspicious marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspiciousCategory {
    /// Passwords, API keys, private keys.
    Credentials,
    /// Shell, SQL or code-evaluation tokens.
    CodeExecution,
    /// HTML/JS injection markers.
    ScriptInjection,
}

impl SuspiciousCategory {
    fn warning(&self) -> &'static str {
        match self {
            Self::Credentials => "Content appears to contain credentials or secrets",
            Self::CodeExecution => "Content contains shell, SQL or code execution tokens",
            Self::ScriptInjection => "Content contains script injection markers",
        }
    }
}

/// Suspicious-content detector.
pub struct SuspiciousContentDetector {
    rules: Vec<(SuspiciousCategory, Regex)>,
}

impl SuspiciousContentDetector {
    /// Creates the detector with the built-in marker lists.
    pub fn new() -> Self {
        let rules = [
            (
                SuspiciousCategory::Credentials,
                r"(?i)(password\s*[:=]|passwd|mot\s+de\s+passe\s*[:=]|api[_\s-]?key|secret[_\s-]?key|access[_\s-]?token|bearer\s+[a-z0-9._-]{16,}|-----begin\s+(rsa\s+|ec\s+|openssh\s+)?private\s+key|\bsk-[a-z0-9]{16,}|\bAKIA[0-9A-Z]{16}\b)",
            ),
            (
                SuspiciousCategory::CodeExecution,
                r"(?i)(rm\s+-rf|\bsudo\s+|chmod\s+[0-7]{3,4}|\bcurl\s+[^|]+\|\s*(ba)?sh|\bdrop\s+table\b|\bdelete\s+from\b|\bunion\s+(all\s+)?select\b|\binsert\s+into\b|;\s*--|\beval\s*\(|\bexec\s*\(|\bsystem\s*\(|\bos\.system|\$\(\s*[a-z])",
            ),
            (
                SuspiciousCategory::ScriptInjection,
                r"(?i)(<\s*script|<\s*iframe|javascript\s*:|\bon(error|load|click|mouseover)\s*=|document\.cookie|window\.location)",
            ),
        ]
        .into_iter()
        .map(|(category, source)| {
            (
                category,
                Regex::new(source).expect("suspicious pattern compiles"),
            )
        })
        .collect();

        Self { rules }
    }

    /// Returns every category with at least one match, in rule order.
    pub fn categories(&self, text: &str) -> Vec<SuspiciousCategory> {
        self.rules
            .iter()
            .filter(|(_, regex)| regex.is_match(text))
            .map(|(category, _)| *category)
            .collect()
    }
}

impl Default for SuspiciousContentDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for SuspiciousContentDetector {
    fn name(&self) -> &'static str {
        "suspicious_content"
    }

    fn inspect(&self, text: &str, _platform: &str) -> DetectorOutcome {
        let categories = self.categories(text);
        if categories.is_empty() {
            return DetectorOutcome::pass();
        }

        DetectorOutcome {
            warnings: categories
                .iter()
                .map(|c| c.warning().to_string())
                .collect(),
            escalation: Escalation::Step,
            block: None,
        }
    }
}

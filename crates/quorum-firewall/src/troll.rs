//! # Troll and Gibberish Detection
//!
//! First stage of the gate. Looks for low-effort submissions: keyboard
//! mashing, single repeated characters, vowel or consonant soup and text with
//! almost no character variety.
//!
//! ## Signals
//!
//! | Signal | Rule |
//! |--------|------|
//! | Too short | fewer than 5 characters after trimming |
//! | Repeated run | 5 or more identical consecutive characters |
//! | Vowel only | text without whitespace made only of vowels |
//! | Consonant only | text without whitespace made only of consonants |
//! | Short random | single 5-12 char token mixing letters and digits |
//! | Low diversity | unique / total alphanumerics below a length-bucketed floor |
//! | Keyboard mash | contains a keyboard row fragment (QWERTY or AZERTY) |
//!
//! ## French Allowlist
//!
//! The product mostly receives French copy, where short function words are
//! dense and can trip the diversity floor. Three or more French function
//! words override every other signal and clear the submission.
//!
//! ## Blocking
//!
//! The detector only warns (medium risk) unless
//! [`FirewallConfig::block_trolls`](crate::FirewallConfig) is set.

use regex::Regex;
use std::collections::HashSet;

use crate::detector::Detector;
use crate::models::{BlockReason, DetectorOutcome, Escalation, RiskLevel};

/// Texts shorter than this (in characters) are treated as trolling.
pub const MIN_TEXT_LENGTH: usize = 5;

/// Identical consecutive characters that count as a repeated run.
pub const REPEATED_RUN_LENGTH: usize = 5;

/// French function words needed to force a non-troll verdict.
pub const FRENCH_ALLOWLIST_THRESHOLD: usize = 3;

/// Keyboard row fragments typical of mashing.
const KEYBOARD_MASH: &[&str] = &[
    "asdf", "sdfg", "dfgh", "fghj", "ghjk", "hjkl", "qwer", "uiop", "zxcv", "xcvb", "cvbn",
    "azer", "qsdf", "wxcv", "jklm", "poiu",
];

/// French function words that indicate real prose.
const FRENCH_FUNCTION_WORDS: &[&str] = &[
    "le", "la", "les", "de", "des", "du", "un", "une", "et", "est", "dans", "pour", "avec",
    "sur", "que", "qui", "pas", "nous", "vous", "ce", "sont", "mais", "ou", "au", "aux",
];

/// Result of running all troll signals over a text.
#[derive(Debug, Clone, PartialEq)]
pub struct TrollAnalysis {
    /// Names of the signals that fired.
    pub signals: Vec<&'static str>,
    /// French function words found.
    pub french_words: usize,
    /// Final decision after the allowlist override.
    pub is_troll: bool,
}

/// Troll/gibberish detector.
pub struct TrollDetector {
    block: bool,
    vowel_only: Regex,
    consonant_only: Regex,
    short_random: Regex,
    french_words: HashSet<&'static str>,
}

impl TrollDetector {
    /// Creates a detector; `block` enables the blocking path.
    pub fn new(block: bool) -> Self {
        Self {
            block,
            vowel_only: Regex::new(r"^[aeiouyàâäéèêëîïôöûùü]+$").expect("vowel pattern compiles"),
            consonant_only: Regex::new(r"^[bcdfghjklmnpqrstvwxzç]+$")
                .expect("consonant pattern compiles"),
            short_random: Regex::new(r"^(?:[a-z]+[0-9]+|[0-9]+[a-z]+)[a-z0-9]*$")
                .expect("short random pattern compiles"),
            french_words: FRENCH_FUNCTION_WORDS.iter().copied().collect(),
        }
    }

    /// Runs every signal and applies the French allowlist.
    pub fn analyze(&self, text: &str) -> TrollAnalysis {
        let trimmed = text.trim();
        let lower = trimmed.to_lowercase();
        let compact: String = lower.chars().filter(|c| !c.is_whitespace()).collect();
        let length = trimmed.chars().count();
        let mut signals = Vec::new();

        if length < MIN_TEXT_LENGTH {
            signals.push("too_short");
        }
        if longest_run(&lower) >= REPEATED_RUN_LENGTH {
            signals.push("repeated_characters");
        }
        if !compact.is_empty() {
            if self.vowel_only.is_match(&compact) {
                signals.push("vowels_only");
            }
            if self.consonant_only.is_match(&compact) {
                signals.push("consonants_only");
            }
        }
        let compact_len = compact.chars().count();
        if compact_len == length
            && (MIN_TEXT_LENGTH..=12).contains(&compact_len)
            && self.short_random.is_match(&compact)
        {
            signals.push("short_random_token");
        }
        if let Some(ratio) = diversity_ratio(&lower) {
            if let Some(floor) = diversity_floor(length) {
                if ratio < floor {
                    signals.push("low_diversity");
                }
            }
        }
        if KEYBOARD_MASH.iter().any(|mash| compact.contains(mash)) {
            signals.push("keyboard_mashing");
        }

        let french_words = lower
            .split(|c: char| !c.is_alphabetic())
            .filter(|word| self.french_words.contains(*word))
            .count();

        let is_troll = !signals.is_empty() && french_words < FRENCH_ALLOWLIST_THRESHOLD;

        TrollAnalysis {
            signals,
            french_words,
            is_troll,
        }
    }
}

impl Default for TrollDetector {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Detector for TrollDetector {
    fn name(&self) -> &'static str {
        "troll"
    }

    fn inspect(&self, text: &str, _platform: &str) -> DetectorOutcome {
        let analysis = self.analyze(text);
        if !analysis.is_troll {
            return DetectorOutcome::pass();
        }

        DetectorOutcome {
            warnings: vec![format!(
                "Content may be gibberish or trolling ({})",
                analysis.signals.join(", ")
            )],
            escalation: Escalation::AtLeast(RiskLevel::Medium),
            block: self.block.then_some(BlockReason::Trolling),
        }
    }
}

/// Length of the longest run of identical characters.
pub fn longest_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut previous = None;

    for c in text.chars() {
        if Some(c) == previous {
            current += 1;
        } else {
            current = 1;
            previous = Some(c);
        }
        longest = longest.max(current);
    }

    longest
}

/// Unique alphanumeric characters divided by total alphanumeric characters.
///
/// Returns `None` when the text has no alphanumerics.
pub fn diversity_ratio(text: &str) -> Option<f64> {
    let chars: Vec<char> = text.chars().filter(|c| c.is_alphanumeric()).collect();
    if chars.is_empty() {
        return None;
    }
    let unique: HashSet<&char> = chars.iter().collect();
    Some(unique.len() as f64 / chars.len() as f64)
}

/// Minimum acceptable diversity for a text of `length` characters.
///
/// Strict below 50 characters, lenient up to 200, not checked beyond:
/// long prose naturally reuses a small alphabet.
pub fn diversity_floor(length: usize) -> Option<f64> {
    match length {
        0..=19 => Some(0.3),
        20..=49 => Some(0.2),
        50..=199 => Some(0.08),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_characters_warn_only() {
        let detector = TrollDetector::default();
        let outcome = detector.inspect("aaaaa", "twitter");

        assert!(!outcome.is_blocking());
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.escalation, Escalation::AtLeast(RiskLevel::Medium));
    }

    #[test]
    fn test_aaaaa_signals() {
        let analysis = TrollDetector::default().analyze("aaaaa");
        assert!(analysis.is_troll);
        assert!(analysis.signals.contains(&"repeated_characters"));
        assert!(analysis.signals.contains(&"vowels_only"));
        assert!(analysis.signals.contains(&"low_diversity"));
    }

    #[test]
    fn test_keyboard_mashing() {
        let analysis = TrollDetector::default().analyze("qsdfghjklm");
        assert!(analysis.is_troll);
        assert!(analysis.signals.contains(&"keyboard_mashing"));
    }

    #[test]
    fn test_short_random_token() {
        let analysis = TrollDetector::default().analyze("x9k2m3");
        assert!(analysis.signals.contains(&"short_random_token"));
    }

    #[test]
    fn test_too_short() {
        let analysis = TrollDetector::default().analyze("ok");
        assert!(analysis.signals.contains(&"too_short"));
        assert!(analysis.is_troll);
    }

    #[test]
    fn test_normal_prose_is_clean() {
        let detector = TrollDetector::default();
        let outcome = detector.inspect(
            "We are launching our new analytics dashboard next week.",
            "linkedin",
        );
        assert!(outcome.is_clean());
    }

    #[test]
    fn test_french_allowlist_overrides_signals() {
        // "asdf" would normally trip keyboard mashing
        let text = "Le produit asdf est dans la boutique pour les clients";
        let analysis = TrollDetector::default().analyze(text);
        assert!(analysis.signals.contains(&"keyboard_mashing"));
        assert!(analysis.french_words >= FRENCH_ALLOWLIST_THRESHOLD);
        assert!(!analysis.is_troll);
    }

    #[test]
    fn test_blocking_path_when_enabled() {
        let detector = TrollDetector::new(true);
        let outcome = detector.inspect("aaaaa", "twitter");
        assert_eq!(outcome.block, Some(BlockReason::Trolling));
    }

    #[test]
    fn test_longest_run() {
        assert_eq!(longest_run(""), 0);
        assert_eq!(longest_run("abc"), 1);
        assert_eq!(longest_run("abbbbc"), 4);
        assert_eq!(longest_run("zzzzzz"), 6);
    }

    #[test]
    fn test_diversity_buckets() {
        assert_eq!(diversity_floor(10), Some(0.3));
        assert_eq!(diversity_floor(30), Some(0.2));
        assert_eq!(diversity_floor(120), Some(0.08));
        assert_eq!(diversity_floor(500), None);
        assert_eq!(diversity_ratio("!!!"), None);
        assert!((diversity_ratio("abab").unwrap() - 0.5).abs() < f64::EPSILON);
    }
}

//! Content quality gate.
//!
//! Fourth stage. Enforces the per-platform minimum length and a minimum
//! number of meaningful words, and warns about a single word dominating the
//! text.

use std::collections::HashMap;

use crate::config::FirewallConfig;
use crate::detector::Detector;
use crate::models::{BlockReason, DetectorOutcome, Escalation, RiskLevel};

/// Words must be longer than this to count as meaningful.
pub const MEANINGFUL_WORD_MIN_CHARS: usize = 2;

/// Word statistics used by the quality checks.
#[derive(Debug, Clone, PartialEq)]
pub struct WordStats {
    /// All whitespace-separated words.
    pub total: usize,
    /// Words longer than two characters.
    pub meaningful: usize,
    /// Most frequent word (lowercased) and its count.
    pub most_frequent: Option<(String, usize)>,
}

impl WordStats {
    /// Computes statistics over `text`.
    pub fn from_text(text: &str) -> Self {
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        let mut total = 0;
        let mut meaningful = 0;

        for raw in text.split_whitespace() {
            total += 1;
            let word: String = raw
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if word.chars().count() > MEANINGFUL_WORD_MIN_CHARS {
                meaningful += 1;
            }
            if word.is_empty() {
                continue;
            }
            let count = counts.entry(word.clone()).or_insert(0);
            if *count == 0 {
                order.push(word);
            }
            *count += 1;
        }

        // First-seen order breaks ties so the result is deterministic.
        let mut most_frequent: Option<(String, usize)> = None;
        for word in order {
            let count = counts[&word];
            if most_frequent.as_ref().map_or(true, |(_, best)| count > *best) {
                most_frequent = Some((word, count));
            }
        }

        Self {
            total,
            meaningful,
            most_frequent,
        }
    }

    /// Share of the most frequent word, 0.0 for empty text.
    pub fn max_frequency(&self) -> f64 {
        match (&self.most_frequent, self.total) {
            (Some((_, count)), total) if total > 0 => *count as f64 / total as f64,
            _ => 0.0,
        }
    }
}

/// Quality detector.
#[derive(Debug, Clone)]
pub struct QualityDetector {
    config: FirewallConfig,
}

impl QualityDetector {
    /// Creates the detector from the gate configuration.
    pub fn new(config: FirewallConfig) -> Self {
        Self { config }
    }
}

impl Default for QualityDetector {
    fn default() -> Self {
        Self::new(FirewallConfig::default())
    }
}

impl Detector for QualityDetector {
    fn name(&self) -> &'static str {
        "quality"
    }

    fn inspect(&self, text: &str, platform: &str) -> DetectorOutcome {
        let mut outcome = DetectorOutcome::pass();
        let trimmed = text.trim();
        let length = trimmed.chars().count();
        let minimum = self.config.min_length_for(platform);
        let stats = WordStats::from_text(trimmed);

        let too_short = (length < minimum).then(|| BlockReason::ContentTooShort {
            platform: platform.to_string(),
            minimum,
            actual: length,
        });
        let too_few_words =
            (stats.meaningful < self.config.min_meaningful_words).then(|| {
                BlockReason::InsufficientWords {
                    found: stats.meaningful,
                    required: self.config.min_meaningful_words,
                }
            });

        for reason in too_short.iter().chain(too_few_words.iter()) {
            outcome.warnings.push(reason.to_string());
        }

        // Length is the more actionable message when both fail.
        if let Some(reason) = too_short.or(too_few_words) {
            outcome.block = Some(reason);
            outcome.escalation = Escalation::AtLeast(RiskLevel::High);
        }

        if stats.max_frequency() > self.config.max_word_frequency {
            if let Some((word, _)) = &stats.most_frequent {
                outcome.warnings.push(format!(
                    "Excessive repetition of \"{}\" ({:.0}% of words)",
                    word,
                    stats.max_frequency() * 100.0
                ));
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_stats() {
        let stats = WordStats::from_text("Buy buy BUY now, friends!");
        assert_eq!(stats.total, 5);
        assert_eq!(stats.meaningful, 5);
        assert_eq!(stats.most_frequent, Some(("buy".to_string(), 3)));
        assert!((stats.max_frequency() - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_short_blog_blocked() {
        let detector = QualityDetector::default();
        let outcome = detector.inspect("Too tiny", "blog");
        assert!(matches!(
            outcome.block,
            Some(BlockReason::ContentTooShort { minimum: 50, actual: 8, .. })
        ));
        assert_eq!(outcome.escalation, Escalation::AtLeast(RiskLevel::High));
    }

    #[test]
    fn test_insufficient_words_blocked() {
        let detector = QualityDetector::default();
        let outcome = detector.inspect("a b c d e f g h i j k", "twitter");
        assert!(matches!(
            outcome.block,
            Some(BlockReason::InsufficientWords { found: 0, required: 3 })
        ));
    }

    #[test]
    fn test_repetition_warns_only() {
        let detector = QualityDetector::default();
        let outcome = detector.inspect("sale sale sale sale today only friends", "twitter");
        assert!(outcome.block.is_none());
        assert_eq!(outcome.escalation, Escalation::None);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("sale"));
    }

    #[test]
    fn test_good_content_passes() {
        let detector = QualityDetector::default();
        let outcome = detector.inspect(
            "Three lessons we learned shipping our first product to enterprise customers.",
            "linkedin",
        );
        assert!(outcome.is_clean());
    }

    #[test]
    fn test_unknown_platform_uses_default_minimum() {
        let detector = QualityDetector::default();
        let outcome = detector.inspect("Short but three words", "mastodon");
        assert!(outcome.block.is_none());

        let outcome = detector.inspect("Too few here", "mastodon");
        assert!(matches!(
            outcome.block,
            Some(BlockReason::ContentTooShort { minimum: 20, .. })
        ));
    }
}

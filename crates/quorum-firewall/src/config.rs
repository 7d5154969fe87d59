//! Configuration for the Security Gate.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::models::FirewallError;

/// Minimum length used when a platform has no entry in the table.
pub const DEFAULT_MIN_LENGTH: usize = 20;

/// Minimum number of words longer than two characters.
pub const DEFAULT_MIN_MEANINGFUL_WORDS: usize = 3;

/// Maximum share of the text a single word may take before it is flagged.
pub const DEFAULT_MAX_WORD_FREQUENCY: f64 = 0.4;

/// How the gate picks the surviving block reason when several detectors block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonPolicy {
    /// The last blocking detector in pipeline order wins.
    #[default]
    LastWriterWins,
    /// The reason with the highest [`severity`](crate::BlockReason::severity) wins.
    /// Ties keep the earlier reason.
    SeverityPrecedence,
}

/// Security Gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirewallConfig {
    /// Whether the troll detector may block. Disabled by default: trolls only warn.
    pub block_trolls: bool,

    /// Block reason resolution when several detectors block.
    pub reason_policy: ReasonPolicy,

    /// Per-platform minimum content length in characters.
    ///
    /// Deserialized entries are laid over the built-in table.
    #[serde(deserialize_with = "merge_min_lengths")]
    pub min_lengths: BTreeMap<String, usize>,

    /// Minimum length for platforms missing from `min_lengths`.
    pub default_min_length: usize,

    /// Required words longer than two characters.
    pub min_meaningful_words: usize,

    /// Maximum frequency of a single word (0.0 - 1.0).
    pub max_word_frequency: f64,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            block_trolls: false,
            reason_policy: ReasonPolicy::LastWriterWins,
            min_lengths: default_min_lengths(),
            default_min_length: DEFAULT_MIN_LENGTH,
            min_meaningful_words: DEFAULT_MIN_MEANINGFUL_WORDS,
            max_word_frequency: DEFAULT_MAX_WORD_FREQUENCY,
        }
    }
}

fn default_min_lengths() -> BTreeMap<String, usize> {
    [("linkedin", 20), ("twitter", 10), ("blog", 50), ("email", 30)]
        .into_iter()
        .map(|(platform, min)| (platform.to_string(), min))
        .collect()
}

fn merge_min_lengths<'de, D>(deserializer: D) -> Result<BTreeMap<String, usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let configured = BTreeMap::<String, usize>::deserialize(deserializer)?;
    let mut min_lengths = default_min_lengths();
    min_lengths.extend(
        configured
            .into_iter()
            .map(|(platform, min)| (platform.to_ascii_lowercase(), min)),
    );
    Ok(min_lengths)
}

impl FirewallConfig {
    /// Minimum content length for `platform` (case-insensitive).
    pub fn min_length_for(&self, platform: &str) -> usize {
        self.min_lengths
            .get(&platform.to_ascii_lowercase())
            .copied()
            .unwrap_or(self.default_min_length)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), FirewallError> {
        if !(0.0..=1.0).contains(&self.max_word_frequency) || self.max_word_frequency == 0.0 {
            return Err(FirewallError::InvalidConfig(format!(
                "max_word_frequency must be in (0.0, 1.0], got {}",
                self.max_word_frequency
            )));
        }
        if self.min_meaningful_words == 0 {
            return Err(FirewallError::InvalidConfig(
                "min_meaningful_words must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_minimums() {
        let config = FirewallConfig::default();
        assert_eq!(config.min_length_for("linkedin"), 20);
        assert_eq!(config.min_length_for("twitter"), 10);
        assert_eq!(config.min_length_for("blog"), 50);
        assert_eq!(config.min_length_for("email"), 30);
        assert_eq!(config.min_length_for("Blog"), 50);
        assert_eq!(config.min_length_for("mastodon"), DEFAULT_MIN_LENGTH);
    }

    #[test]
    fn test_default_validates() {
        assert!(FirewallConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_frequency_rejected() {
        let config = FirewallConfig {
            max_word_frequency: 1.5,
            ..FirewallConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_deserializes() {
        let config: FirewallConfig =
            serde_json::from_str(r#"{ "block_trolls": true }"#).unwrap();
        assert!(config.block_trolls);
        assert_eq!(config.reason_policy, ReasonPolicy::LastWriterWins);
        assert_eq!(config.min_length_for("blog"), 50);
    }

    #[test]
    fn test_partial_min_lengths_merge_over_defaults() {
        let config: FirewallConfig =
            serde_json::from_str(r#"{ "min_lengths": { "Twitter": 5, "mastodon": 15 } }"#)
                .unwrap();
        assert_eq!(config.min_length_for("twitter"), 5);
        assert_eq!(config.min_length_for("mastodon"), 15);
        assert_eq!(config.min_length_for("blog"), 50);
        assert_eq!(config.min_length_for("email"), 30);
    }
}

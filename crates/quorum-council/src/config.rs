//! Consolidation settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CouncilError;

/// Consolidation engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CouncilConfig {
    /// Seconds a health probe result stays valid.
    pub health_ttl_secs: u64,
    /// Cap on merged insights.
    pub max_insights: usize,
    /// Cap on merged recommendations.
    pub max_recommendations: usize,
    /// Cap on merged hashtags.
    pub max_hashtags: usize,
    /// Cap on merged engagement predictions.
    pub max_engagement: usize,
    /// Distance from the mean score above which a provider is flagged.
    pub deviation_threshold: f64,
}

impl Default for CouncilConfig {
    fn default() -> Self {
        Self {
            health_ttl_secs: 30,
            max_insights: 5,
            max_recommendations: 5,
            max_hashtags: 5,
            max_engagement: 3,
            deviation_threshold: 20.0,
        }
    }
}

impl CouncilConfig {
    /// Health TTL as a [`Duration`].
    pub fn health_ttl(&self) -> Duration {
        Duration::from_secs(self.health_ttl_secs)
    }

    /// Rejects empty caps and a non-positive deviation threshold.
    pub fn validate(&self) -> Result<(), CouncilError> {
        let caps = [
            ("max_insights", self.max_insights),
            ("max_recommendations", self.max_recommendations),
            ("max_hashtags", self.max_hashtags),
            ("max_engagement", self.max_engagement),
        ];
        if let Some((name, _)) = caps.iter().find(|(_, cap)| *cap == 0) {
            return Err(CouncilError::InvalidConfig(format!(
                "{} must be at least 1",
                name
            )));
        }
        if !(self.deviation_threshold.is_finite() && self.deviation_threshold > 0.0) {
            return Err(CouncilError::InvalidConfig(format!(
                "deviation_threshold must be positive, got {}",
                self.deviation_threshold
            )));
        }
        Ok(())
    }
}

//! Admission budgets.
//!
//! Each platform has its own [`RateLimitConfig`]; platforms without an entry
//! fall back to [`LimiterConfig::default_limits`].
//!
//! ## Default Budgets
//!
//! | Platform | /min | /hour | /day | $/day | tokens/request | concurrent |
//! |----------|------|-------|------|-------|----------------|------------|
//! | linkedin | 10   | 100   | 500  | 5.0   | 4000           | 3          |
//! | twitter  | 20   | 200   | 1000 | 3.0   | 2000           | 5          |
//! | blog     | 5    | 50    | 200  | 10.0  | 8000           | 2          |
//! | email    | 15   | 150   | 800  | 5.0   | 4000           | 3          |
//! | default  | 10   | 100   | 500  | 5.0   | 4000           | 3          |

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::error::{LimiterError, Result};

/// Default interval between two expired-usage sweeps.
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 300;

/// Budget for one platform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Admissions per rolling minute.
    pub requests_per_minute: u32,
    /// Admissions per rolling hour.
    pub requests_per_hour: u32,
    /// Admissions per rolling day.
    pub requests_per_day: u32,
    /// Spend ceiling per rolling day.
    pub max_cost_per_day: f64,
    /// Largest estimated token count a single request may carry.
    pub max_tokens_per_request: u32,
    /// Requests that may be in flight at once.
    pub concurrent_requests: u32,
}

impl RateLimitConfig {
    /// Creates a budget.
    #[must_use]
    pub const fn new(
        requests_per_minute: u32,
        requests_per_hour: u32,
        requests_per_day: u32,
        max_cost_per_day: f64,
        max_tokens_per_request: u32,
        concurrent_requests: u32,
    ) -> Self {
        Self {
            requests_per_minute,
            requests_per_hour,
            requests_per_day,
            max_cost_per_day,
            max_tokens_per_request,
            concurrent_requests,
        }
    }

    /// Applies every field set in `patch`.
    pub fn apply(&mut self, patch: &RateLimitConfigPatch) {
        if let Some(v) = patch.requests_per_minute {
            self.requests_per_minute = v;
        }
        if let Some(v) = patch.requests_per_hour {
            self.requests_per_hour = v;
        }
        if let Some(v) = patch.requests_per_day {
            self.requests_per_day = v;
        }
        if let Some(v) = patch.max_cost_per_day {
            self.max_cost_per_day = v;
        }
        if let Some(v) = patch.max_tokens_per_request {
            self.max_tokens_per_request = v;
        }
        if let Some(v) = patch.concurrent_requests {
            self.concurrent_requests = v;
        }
    }

    /// Rejects zero windows and negative spend.
    pub fn validate(&self) -> Result<()> {
        if self.requests_per_minute == 0 || self.requests_per_hour == 0 || self.requests_per_day == 0
        {
            return Err(LimiterError::InvalidConfig(
                "request windows must allow at least one request".to_string(),
            ));
        }
        if self.concurrent_requests == 0 {
            return Err(LimiterError::InvalidConfig(
                "concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.max_tokens_per_request == 0 {
            return Err(LimiterError::InvalidConfig(
                "max_tokens_per_request must be at least 1".to_string(),
            ));
        }
        if !self.max_cost_per_day.is_finite() || self.max_cost_per_day < 0.0 {
            return Err(LimiterError::InvalidConfig(format!(
                "max_cost_per_day must be a non-negative amount, got {}",
                self.max_cost_per_day
            )));
        }
        Ok(())
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(10, 100, 500, 5.0, 4000, 3)
    }
}

/// Partial update for a [`RateLimitConfig`]. Unset fields are left alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfigPatch {
    pub requests_per_minute: Option<u32>,
    pub requests_per_hour: Option<u32>,
    pub requests_per_day: Option<u32>,
    pub max_cost_per_day: Option<f64>,
    pub max_tokens_per_request: Option<u32>,
    pub concurrent_requests: Option<u32>,
}

/// Kind of operation being admitted.
///
/// Carried into logs only; every kind draws on the same budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Fan-out analysis across every provider.
    #[default]
    Analysis,
    /// Content rewrite.
    Optimization,
    /// Hashtag generation.
    Hashtags,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Analysis => "analysis",
            Self::Optimization => "optimization",
            Self::Hashtags => "hashtags",
        })
    }
}

/// Limiter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    /// Budgets keyed by lowercase platform name.
    ///
    /// Deserialized entries are laid over the built-in table, so a file that
    /// only sets `twitter` keeps the other platforms' defaults.
    #[serde(deserialize_with = "merge_platforms")]
    pub platforms: BTreeMap<String, RateLimitConfig>,
    /// Budget for platforms missing from `platforms`.
    #[serde(rename = "default")]
    pub default_limits: RateLimitConfig,
    /// Seconds between two expired-usage sweeps.
    pub cleanup_interval_secs: u64,
}

impl LimiterConfig {
    /// Sweep interval as a [`Duration`].
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    /// Validates every budget and the sweep interval.
    pub fn validate(&self) -> Result<()> {
        self.default_limits.validate()?;
        for (platform, limits) in &self.platforms {
            limits.validate().map_err(|e| {
                LimiterError::InvalidConfig(format!("platform {}: {}", platform, e))
            })?;
        }
        if self.cleanup_interval_secs == 0 {
            return Err(LimiterError::InvalidConfig(
                "cleanup_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            platforms: default_platforms(),
            default_limits: RateLimitConfig::default(),
            cleanup_interval_secs: DEFAULT_CLEANUP_INTERVAL_SECS,
        }
    }
}

fn default_platforms() -> BTreeMap<String, RateLimitConfig> {
    [
        ("linkedin", RateLimitConfig::new(10, 100, 500, 5.0, 4000, 3)),
        ("twitter", RateLimitConfig::new(20, 200, 1000, 3.0, 2000, 5)),
        ("blog", RateLimitConfig::new(5, 50, 200, 10.0, 8000, 2)),
        ("email", RateLimitConfig::new(15, 150, 800, 5.0, 4000, 3)),
    ]
    .into_iter()
    .map(|(name, limits)| (name.to_string(), limits))
    .collect()
}

fn merge_platforms<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, RateLimitConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let configured = BTreeMap::<String, RateLimitConfig>::deserialize(deserializer)?;
    let mut platforms = default_platforms();
    platforms.extend(
        configured
            .into_iter()
            .map(|(name, limits)| (name.to_ascii_lowercase(), limits)),
    );
    Ok(platforms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_platform_budgets() {
        let config = LimiterConfig::default();
        assert_eq!(config.platforms["twitter"].requests_per_minute, 20);
        assert_eq!(config.platforms["blog"].concurrent_requests, 2);
        assert_eq!(config.cleanup_interval(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_patch_only_touches_set_fields() {
        let mut limits = RateLimitConfig::default();
        limits.apply(&RateLimitConfigPatch {
            requests_per_minute: Some(42),
            ..RateLimitConfigPatch::default()
        });
        assert_eq!(limits.requests_per_minute, 42);
        assert_eq!(limits.requests_per_hour, 100);
        assert_eq!(limits.concurrent_requests, 3);
    }

    #[test]
    fn test_zero_window_rejected() {
        let limits = RateLimitConfig::new(0, 100, 500, 5.0, 4000, 3);
        assert!(limits.validate().is_err());

        let mut config = LimiterConfig::default();
        config.platforms.insert("blog".to_string(), limits);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("blog"));
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: LimiterConfig =
            serde_json::from_str(r#"{ "cleanup_interval_secs": 60 }"#).unwrap();
        assert_eq!(config.cleanup_interval_secs, 60);
        assert_eq!(config.platforms.len(), 4);
    }

    #[test]
    fn test_partial_platform_table_merges_over_defaults() {
        let config: LimiterConfig = serde_json::from_str(
            r#"{ "platforms": {
                "Twitter": { "requests_per_minute": 5, "requests_per_hour": 50,
                             "requests_per_day": 100, "max_cost_per_day": 1.0,
                             "max_tokens_per_request": 1000, "concurrent_requests": 1 },
                "mastodon": { "requests_per_minute": 8, "requests_per_hour": 80,
                              "requests_per_day": 300, "max_cost_per_day": 2.0,
                              "max_tokens_per_request": 1500, "concurrent_requests": 2 }
            } }"#,
        )
        .unwrap();

        assert_eq!(config.platforms.len(), 5);
        assert_eq!(config.platforms["twitter"].requests_per_minute, 5);
        assert_eq!(config.platforms["mastodon"].max_tokens_per_request, 1500);
        assert_eq!(config.platforms["blog"].max_tokens_per_request, 8000);
        assert_eq!(config.platforms["blog"].concurrent_requests, 2);
    }
}

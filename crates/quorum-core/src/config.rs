//! Configuration types for the Quorum gateway.

use serde::{Deserialize, Serialize};

use quorum_council::CouncilConfig;
use quorum_firewall::FirewallConfig;
use quorum_limiter::LimiterConfig;

use crate::Result;

/// Configuration for the whole gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Security Gate configuration.
    pub firewall: FirewallConfig,

    /// Admission Controller budgets.
    pub limiter: LimiterConfig,

    /// Consolidation Engine configuration.
    pub council: CouncilConfig,

    /// Global settings.
    pub global: GlobalConfig,
}

impl GatewayConfig {
    /// Validates every section.
    pub fn validate(&self) -> Result<()> {
        self.firewall.validate()?;
        self.limiter.validate()?;
        self.council.validate()?;
        Ok(())
    }
}

/// Global gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Run content disarm before dispatching to providers.
    pub sanitize_input: bool,

    /// Log one audit line per security verdict (digest only, never content).
    pub audit_logging: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            sanitize_input: true,
            audit_logging: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert!(config.global.sanitize_input);
        assert!(config.global.audit_logging);
        assert_eq!(config.limiter.platforms["twitter"].requests_per_minute, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = GatewayConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: GatewayConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(
            parsed.limiter.platforms["blog"],
            config.limiter.platforms["blog"]
        );
        assert_eq!(parsed.council, config.council);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: GatewayConfig =
            serde_json::from_str(r#"{ "global": { "sanitize_input": false } }"#).unwrap();
        assert!(!parsed.global.sanitize_input);
        assert!(parsed.global.audit_logging);
        assert_eq!(parsed.council.max_engagement, 3);
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = GatewayConfig::default();
        config.limiter.default_limits.requests_per_minute = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_empty_cap_rejected() {
        let mut config = GatewayConfig::default();
        config.council.max_recommendations = 0;
        assert!(config.validate().is_err());
    }
}

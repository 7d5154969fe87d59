//! Error types for the Quorum orchestrator.

use chrono::{DateTime, Utc};
use quorum_council::CouncilError;
use quorum_firewall::FirewallError;
use quorum_limiter::LimiterError;
use thiserror::Error;

/// Error returned by [`Orchestrator::analyze`](crate::Orchestrator::analyze)
/// and the administrative operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The actor is over one of its budgets.
    #[error("Rate limited: {reason}")]
    RateLimited {
        reason: String,
        /// When the exhausted window rolls over.
        reset_time: DateTime<Utc>,
        cost_remaining: f64,
    },

    /// The Security Gate rejected the content.
    #[error("Content blocked: {reason}")]
    SecurityBlocked {
        reason: String,
        warnings: Vec<String>,
        recommendations: Vec<String>,
    },

    /// No provider could produce an analysis.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Configuration rejected at construction or update.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTP status the REST layer should answer with.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::RateLimited { .. } => 429,
            Self::SecurityBlocked { .. } => 400,
            Self::ServiceUnavailable(_) => 503,
            Self::Config(_) | Self::Internal(_) => 500,
        }
    }
}

impl From<CouncilError> for GatewayError {
    fn from(err: CouncilError) -> Self {
        match err {
            CouncilError::InvalidConfig(msg) => Self::Config(msg),
            other => Self::ServiceUnavailable(other.to_string()),
        }
    }
}

impl From<LimiterError> for GatewayError {
    fn from(err: LimiterError) -> Self {
        match err {
            LimiterError::InvalidConfig(msg) => Self::Config(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<FirewallError> for GatewayError {
    fn from(err: FirewallError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let limited = GatewayError::RateLimited {
            reason: "Minute rate limit exceeded".to_string(),
            reset_time: Utc::now(),
            cost_remaining: 1.0,
        };
        assert_eq!(limited.status_code(), 429);
        assert_eq!(limited.to_string(), "Rate limited: Minute rate limit exceeded");

        let blocked = GatewayError::SecurityBlocked {
            reason: "Potential prompt injection detected".to_string(),
            warnings: Vec::new(),
            recommendations: Vec::new(),
        };
        assert_eq!(blocked.status_code(), 400);
        assert_eq!(GatewayError::ServiceUnavailable(String::new()).status_code(), 503);
        assert_eq!(GatewayError::Internal(String::new()).status_code(), 500);
    }

    #[test]
    fn test_council_errors_map_to_unavailable() {
        let err: GatewayError = CouncilError::NoHealthyProviders.into();
        assert_eq!(err.status_code(), 503);
        assert_eq!(
            err.to_string(),
            "Service unavailable: No healthy AI providers available"
        );
    }

    #[test]
    fn test_store_errors_map_to_internal() {
        let err: GatewayError = LimiterError::Store("disk full".to_string()).into();
        assert_eq!(err.status_code(), 500);
    }
}

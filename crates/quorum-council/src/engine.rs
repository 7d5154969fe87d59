//! Consolidation engine facade.
//!
//! Filters providers by health, fans the request out, drops failed answers
//! and merges the rest into one [`ConsolidatedResult`].

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::CouncilConfig;
use crate::consensus::ConsensusEngine;
use crate::dispatch::{dispatch_all, Dispatched};
use crate::error::CouncilError;
use crate::health::HealthCache;
use crate::model::{AnalysisRequest, ConsolidatedResult, ProviderResponse, UsageSummary};
use crate::provider::AnalysisProvider;
use crate::Result;

/// Runs one request against many providers and merges the answers.
///
/// # Example
///
/// ```rust
/// use quorum_council::{
///     AnalysisProvider, AnalysisRequest, ConsolidationEngine, Platform, ProviderKind,
///     SimulatedProvider,
/// };
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let engine = ConsolidationEngine::new();
/// let providers: Vec<Arc<dyn AnalysisProvider>> = vec![
///     Arc::new(SimulatedProvider::new("openai", ProviderKind::OpenAi).with_score(80.0)),
///     Arc::new(SimulatedProvider::new("gemini", ProviderKind::Gemini).with_score(70.0)),
/// ];
/// let request = AnalysisRequest::new("u1", Platform::Linkedin, "Our Q3 roadmap is live.");
///
/// let result = engine.consolidate_analysis(&providers, &request).await.unwrap();
/// assert_eq!(result.consensus.score, 75.0);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConsolidationEngine {
    config: CouncilConfig,
    consensus: ConsensusEngine,
    health: HealthCache,
}

impl ConsolidationEngine {
    /// Creates an engine with default caps and a 30 second health TTL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine from a validated config.
    pub fn with_config(config: CouncilConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            consensus: ConsensusEngine::new(config.clone()),
            health: HealthCache::new(config.health_ttl()),
            config,
        })
    }

    pub fn config(&self) -> &CouncilConfig {
        &self.config
    }

    pub fn health_cache(&self) -> &HealthCache {
        &self.health
    }

    /// Re-probes every provider, ignoring cached health.
    pub async fn refresh_health(
        &self,
        providers: &[Arc<dyn AnalysisProvider>],
    ) -> Vec<(String, bool)> {
        let statuses = self.health.refresh(providers).await;
        let healthy = statuses.iter().filter(|(_, ok)| *ok).count();
        info!(total = statuses.len(), healthy, "provider health refreshed");
        statuses
    }

    /// Consolidates one request across `providers`.
    ///
    /// # Errors
    ///
    /// - [`CouncilError::NoHealthyProviders`] when the health filter leaves
    ///   nothing to call
    /// - [`CouncilError::AllProvidersFailed`] when every dispatched provider
    ///   failed hard or soft
    pub async fn consolidate_analysis(
        &self,
        providers: &[Arc<dyn AnalysisProvider>],
        request: &AnalysisRequest,
    ) -> Result<ConsolidatedResult> {
        let healthy = self.health.filter_healthy(providers).await;
        if healthy.is_empty() {
            warn!(registered = providers.len(), "no healthy providers");
            return Err(CouncilError::NoHealthyProviders);
        }
        debug!(
            registered = providers.len(),
            healthy = healthy.len(),
            "dispatching analysis"
        );

        let dispatched = dispatch_all(&healthy, request).await;
        let attempted = dispatched.len();
        let (valid, failures) = partition(dispatched);

        if valid.is_empty() {
            warn!(attempted, "all providers failed");
            return Err(CouncilError::AllProvidersFailed {
                attempted,
                failures,
            });
        }

        let consensus = self
            .consensus
            .build(&valid)
            .ok_or_else(|| CouncilError::AllProvidersFailed {
                attempted,
                failures: failures.clone(),
            })?;

        let usage = UsageSummary {
            providers_attempted: attempted,
            providers_succeeded: valid.len(),
            failures,
            total_tokens: valid
                .iter()
                .map(|r| u64::from(r.metadata.tokens_used))
                .sum(),
            total_cost: valid.iter().map(|r| r.metadata.cost).sum(),
        };

        info!(
            providers = usage.providers_succeeded,
            score = consensus.analysis.score,
            confidence = consensus.confidence,
            conflicts = consensus.conflicts.len(),
            "analysis consolidated"
        );

        let provider_insights: BTreeMap<String, ProviderResponse> = valid
            .into_iter()
            .map(|response| (response.provider.clone(), response))
            .collect();

        Ok(ConsolidatedResult {
            consensus: consensus.analysis,
            provider_insights,
            confidence: consensus.confidence,
            conflicts: consensus.conflicts,
            usage,
        })
    }
}

/// Splits outcomes into valid responses and `name: error` lines.
///
/// A response only counts as valid when it carries no in-band error and its
/// score lies in `0..=100`.
fn partition(dispatched: Vec<Dispatched>) -> (Vec<ProviderResponse>, Vec<String>) {
    let mut valid = Vec::with_capacity(dispatched.len());
    let mut failures = Vec::new();

    for Dispatched { provider, outcome } in dispatched {
        match outcome {
            Ok(response) => {
                if let Some(error) = &response.error {
                    warn!(provider = %provider, error = %error, "provider returned soft error");
                    failures.push(format!("{}: {}", provider, error));
                } else if !response.analysis.has_valid_score() {
                    let score = response.analysis.score;
                    warn!(provider = %provider, score, "provider returned invalid score");
                    failures.push(format!("{}: invalid score {}", provider, score));
                } else {
                    valid.push(response);
                }
            }
            Err(e) => {
                warn!(provider = %provider, error = %e, "provider call failed");
                failures.push(format!("{}: {}", provider, e));
            }
        }
    }
    (valid, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Platform;
    use crate::provider::ProviderKind;
    use crate::simulated::{HealthBehavior, SimulatedFailure, SimulatedProvider};

    fn request() -> AnalysisRequest {
        AnalysisRequest::new("u1", Platform::Linkedin, "Three lessons from shipping our API.")
    }

    #[tokio::test]
    async fn test_empty_provider_list() {
        let engine = ConsolidationEngine::new();
        let err = engine.consolidate_analysis(&[], &request()).await.unwrap_err();
        assert!(matches!(err, CouncilError::NoHealthyProviders));
    }

    #[tokio::test]
    async fn test_unhealthy_providers_not_called() {
        let down = Arc::new(
            SimulatedProvider::new("down", ProviderKind::OpenAi)
                .with_health(HealthBehavior::Unhealthy),
        );
        let providers: Vec<Arc<dyn AnalysisProvider>> = vec![down.clone()];

        let engine = ConsolidationEngine::new();
        let err = engine
            .consolidate_analysis(&providers, &request())
            .await
            .unwrap_err();
        assert!(matches!(err, CouncilError::NoHealthyProviders));
        assert_eq!(down.analyze_calls(), 0);
    }

    #[tokio::test]
    async fn test_all_failed_lists_each_provider() {
        let providers: Vec<Arc<dyn AnalysisProvider>> = vec![
            Arc::new(
                SimulatedProvider::new("a", ProviderKind::OpenAi)
                    .with_failure(SimulatedFailure::Hard("timeout".to_string())),
            ),
            Arc::new(
                SimulatedProvider::new("b", ProviderKind::Anthropic)
                    .with_failure(SimulatedFailure::Soft("quota".to_string())),
            ),
        ];

        let engine = ConsolidationEngine::new();
        match engine.consolidate_analysis(&providers, &request()).await {
            Err(CouncilError::AllProvidersFailed {
                attempted,
                failures,
            }) => {
                assert_eq!(attempted, 2);
                assert_eq!(failures.len(), 2);
                assert!(failures[0].starts_with("a: "));
                assert_eq!(failures[1], "b: quota");
            }
            other => panic!("expected AllProvidersFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_usage_counts_only_valid_responses() {
        let providers: Vec<Arc<dyn AnalysisProvider>> = vec![
            Arc::new(SimulatedProvider::new("a", ProviderKind::OpenAi).with_score(70.0)),
            Arc::new(
                SimulatedProvider::new("b", ProviderKind::Gemini)
                    .with_failure(SimulatedFailure::Soft("bad json".to_string())),
            ),
        ];

        let engine = ConsolidationEngine::new();
        let result = engine
            .consolidate_analysis(&providers, &request())
            .await
            .unwrap();
        assert_eq!(result.usage.providers_attempted, 2);
        assert_eq!(result.usage.providers_succeeded, 1);
        assert_eq!(result.usage.failures, vec!["b: bad json".to_string()]);
        assert_eq!(result.confidence, 0.7);
        assert!(result.provider_insights.contains_key("a"));
        assert!(!result.provider_insights.contains_key("b"));
        let tokens = result.provider_insights["a"].metadata.tokens_used;
        assert_eq!(result.usage.total_tokens, u64::from(tokens));
    }

    #[tokio::test]
    async fn test_out_of_range_scores_excluded() {
        let providers: Vec<Arc<dyn AnalysisProvider>> = vec![
            Arc::new(SimulatedProvider::new("a", ProviderKind::OpenAi).with_score(70.0)),
            Arc::new(SimulatedProvider::new("b", ProviderKind::Gemini).with_score(f64::NAN)),
            Arc::new(SimulatedProvider::new("c", ProviderKind::Mistral).with_score(140.0)),
        ];

        let engine = ConsolidationEngine::new();
        let result = engine
            .consolidate_analysis(&providers, &request())
            .await
            .unwrap();
        assert_eq!(result.consensus.score, 70.0);
        assert_eq!(result.confidence, 0.7);
        assert_eq!(result.usage.providers_attempted, 3);
        assert_eq!(result.usage.providers_succeeded, 1);
        assert_eq!(
            result.usage.failures,
            vec!["b: invalid score NaN".to_string(), "c: invalid score 140".to_string()]
        );
    }

    #[tokio::test]
    async fn test_only_invalid_scores_is_total_failure() {
        let providers: Vec<Arc<dyn AnalysisProvider>> = vec![Arc::new(
            SimulatedProvider::new("a", ProviderKind::OpenAi).with_score(-5.0),
        )];

        let engine = ConsolidationEngine::new();
        let err = engine
            .consolidate_analysis(&providers, &request())
            .await
            .unwrap_err();
        assert!(matches!(err, CouncilError::AllProvidersFailed { attempted: 1, .. }));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = CouncilConfig {
            max_insights: 0,
            ..CouncilConfig::default()
        };
        assert!(ConsolidationEngine::with_config(config).is_err());
    }
}

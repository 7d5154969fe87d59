//! Pre-flight token and cost estimates used for admission.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use quorum_council::{total_cost_per_token, AnalysisProvider, AnalysisRequest};

/// Prompt and response tokens added on top of the content.
pub const DEFAULT_OVERHEAD_TOKENS: u32 = 500;

/// Characters per token assumed by the heuristic.
const CHARS_PER_TOKEN: u32 = 4;

/// What a request is expected to consume across all providers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub tokens: u32,
    pub cost: f64,
}

/// Estimates the spend of a request before it is admitted.
pub trait CostEstimator: Send + Sync {
    fn estimate(
        &self,
        request: &AnalysisRequest,
        providers: &[Arc<dyn AnalysisProvider>],
    ) -> CostEstimate;
}

/// Character-count heuristic.
///
/// `tokens = chars / 4 + overhead`, raised to the request's `max_tokens`
/// hint when that is larger. Every registered provider is billed.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicEstimator {
    overhead_tokens: u32,
}

impl HeuristicEstimator {
    pub fn new(overhead_tokens: u32) -> Self {
        Self { overhead_tokens }
    }
}

impl Default for HeuristicEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_OVERHEAD_TOKENS)
    }
}

impl CostEstimator for HeuristicEstimator {
    fn estimate(
        &self,
        request: &AnalysisRequest,
        providers: &[Arc<dyn AnalysisProvider>],
    ) -> CostEstimate {
        let chars = u32::try_from(request.content.chars().count()).unwrap_or(u32::MAX);
        let heuristic = (chars / CHARS_PER_TOKEN).saturating_add(self.overhead_tokens);
        let tokens = request.max_tokens.map_or(heuristic, |hint| hint.max(heuristic));

        CostEstimate {
            tokens,
            cost: f64::from(tokens) * total_cost_per_token(providers),
        }
    }
}

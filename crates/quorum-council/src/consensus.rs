//! Consensus over valid provider responses.
//!
//! A pure function of the ordered response list: the same responses in the
//! same order always produce the same analysis, confidence and conflicts.
//!
//! # Merge Rules
//!
//! - Score is the rounded mean
//! - Lists are concatenated in provider order, de-duplicated by exact string
//!   equality and capped
//! - Optimization text comes from the highest-scoring response; ties keep the
//!   earliest
//! - Confidence is 0.7 for a single response, otherwise
//!   `max(0.3, 0.8 - min(stddev / 20, 0.3))`

use std::collections::{BTreeMap, HashSet};

use crate::config::CouncilConfig;
use crate::model::{Analysis, Conflict, PerceptionMetrics, ProviderResponse};

/// Confidence reported when only one provider answered.
pub const SINGLE_PROVIDER_CONFIDENCE: f64 = 0.7;

/// Upper bound of confidence.
pub const MAX_CONFIDENCE: f64 = 0.8;

/// Lower bound of confidence.
pub const MIN_CONFIDENCE: f64 = 0.3;

/// Largest penalty applied for score spread.
const MAX_SPREAD_PENALTY: f64 = 0.3;

/// Score spread that costs one full point of confidence.
const SPREAD_SCALE: f64 = 20.0;

/// Responses needed before unique recommendations are flagged.
const UNIQUE_RECOMMENDATION_MIN_PROVIDERS: usize = 3;

/// Merged view of N valid responses.
#[derive(Debug, Clone, PartialEq)]
pub struct Consensus {
    pub analysis: Analysis,
    pub confidence: f64,
    pub conflicts: Vec<Conflict>,
}

/// Consensus builder.
#[derive(Debug, Clone, Default)]
pub struct ConsensusEngine {
    config: CouncilConfig,
}

impl ConsensusEngine {
    /// Creates a builder with the given caps and threshold.
    pub fn new(config: CouncilConfig) -> Self {
        Self { config }
    }

    /// Merges `responses`. Returns `None` for an empty slice.
    pub fn build(&self, responses: &[ProviderResponse]) -> Option<Consensus> {
        if responses.is_empty() {
            return None;
        }

        let scores: Vec<f64> = responses.iter().map(|r| r.analysis.score).collect();
        let mean = mean(&scores);

        let analysis = Analysis {
            score: mean.round(),
            insights: merge_lists(
                responses.iter().map(|r| &r.analysis.insights),
                self.config.max_insights,
            ),
            recommendations: merge_lists(
                responses.iter().map(|r| &r.analysis.recommendations),
                self.config.max_recommendations,
            ),
            optimization: best_optimization(responses),
            hashtags: merge_lists(
                responses.iter().map(|r| &r.analysis.hashtags),
                self.config.max_hashtags,
            ),
            engagement: merge_lists(
                responses.iter().map(|r| &r.analysis.engagement),
                self.config.max_engagement,
            ),
            subscores: average_subscores(responses),
            perception: average_perception(responses),
        };

        let mut conflicts = self.score_conflicts(responses, mean);
        if responses.len() >= UNIQUE_RECOMMENDATION_MIN_PROVIDERS {
            conflicts.extend(unique_recommendations(responses));
        }

        Some(Consensus {
            analysis,
            confidence: confidence(&scores),
            conflicts,
        })
    }

    fn score_conflicts(&self, responses: &[ProviderResponse], mean: f64) -> Vec<Conflict> {
        responses
            .iter()
            .filter(|r| (r.analysis.score - mean).abs() > self.config.deviation_threshold)
            .map(|r| Conflict::ScoreDeviation {
                provider: r.provider.clone(),
                score: r.analysis.score,
                consensus: mean.round(),
            })
            .collect()
    }
}

/// Agreement between scores, in [`MIN_CONFIDENCE`, `MAX_CONFIDENCE`].
pub fn confidence(scores: &[f64]) -> f64 {
    if scores.len() <= 1 {
        return SINGLE_PROVIDER_CONFIDENCE;
    }
    let penalty = (population_stddev(scores) / SPREAD_SCALE).min(MAX_SPREAD_PENALTY);
    (MAX_CONFIDENCE - penalty).max(MIN_CONFIDENCE)
}

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; 0.0 for an empty slice.
pub fn population_stddev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn merge_lists<'a>(lists: impl Iterator<Item = &'a Vec<String>>, cap: usize) -> Vec<String> {
    let mut seen: HashSet<&String> = HashSet::new();
    lists
        .flatten()
        .filter(|item| seen.insert(*item))
        .take(cap)
        .cloned()
        .collect()
}

fn best_optimization(responses: &[ProviderResponse]) -> String {
    let mut best: Option<&ProviderResponse> = None;
    for response in responses {
        if best.map_or(true, |b| response.analysis.score > b.analysis.score) {
            best = Some(response);
        }
    }
    best.map(|r| r.analysis.optimization.clone())
        .unwrap_or_default()
}

fn unique_recommendations(responses: &[ProviderResponse]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    let mut reported = HashSet::new();

    for response in responses {
        for recommendation in &response.analysis.recommendations {
            if !reported.insert(recommendation.as_str()) {
                continue;
            }
            let holders = responses
                .iter()
                .filter(|r| r.analysis.recommendations.contains(recommendation))
                .count();
            if holders == 1 {
                conflicts.push(Conflict::UniqueRecommendation {
                    provider: response.provider.clone(),
                    recommendation: recommendation.clone(),
                });
            }
        }
    }
    conflicts
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn average_subscores(responses: &[ProviderResponse]) -> Option<BTreeMap<String, f64>> {
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for subscores in responses.iter().filter_map(|r| r.analysis.subscores.as_ref()) {
        for (name, value) in subscores {
            let entry = sums.entry(name.clone()).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }
    if sums.is_empty() {
        return None;
    }
    Some(
        sums.into_iter()
            .map(|(name, (sum, n))| (name, round_one_decimal(sum / n as f64)))
            .collect(),
    )
}

fn average_perception(responses: &[ProviderResponse]) -> Option<PerceptionMetrics> {
    let reported: Vec<&PerceptionMetrics> = responses
        .iter()
        .filter_map(|r| r.analysis.perception.as_ref())
        .collect();
    if reported.is_empty() {
        return None;
    }
    let n = reported.len() as f64;
    let avg = |field: fn(&PerceptionMetrics) -> f64| {
        round_one_decimal(reported.iter().map(|p| field(p)).sum::<f64>() / n)
    };
    Some(PerceptionMetrics {
        clarity: avg(|p| p.clarity),
        credibility: avg(|p| p.credibility),
        emotional_impact: avg(|p| p.emotional_impact),
        call_to_action: avg(|p| p.call_to_action),
    })
}

//! Requests, provider responses and consolidated results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Publishing platform the content is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linkedin,
    Twitter,
    Blog,
    Email,
}

impl Platform {
    /// All platforms, in declaration order.
    pub const ALL: [Platform; 4] = [
        Platform::Linkedin,
        Platform::Twitter,
        Platform::Blog,
        Platform::Email,
    ];

    /// Lowercase wire name, also the key used by budgets and minimum lengths.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Linkedin => "linkedin",
            Self::Twitter => "twitter",
            Self::Blog => "blog",
            Self::Email => "email",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown platform '{}'", s))
    }
}

/// One analysis job. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Text to analyze.
    pub content: String,
    /// Target platform.
    pub platform: Platform,
    /// Kind of content, e.g. "post" or "newsletter".
    pub content_type: String,
    /// Requested tone, if any.
    pub tone: Option<String>,
    /// Upper bound on tokens the caller is willing to spend.
    pub max_tokens: Option<u32>,
    /// Sampling temperature hint.
    pub temperature: Option<f32>,
    /// Caller identity used for budgeting.
    pub actor_id: String,
}

impl AnalysisRequest {
    /// Creates a request with content type "post" and no hints.
    pub fn new(
        actor_id: impl Into<String>,
        platform: Platform,
        content: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            platform,
            content_type: "post".to_string(),
            tone: None,
            max_tokens: None,
            temperature: None,
            actor_id: actor_id.into(),
        }
    }

    /// Sets the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Sets the tone.
    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = Some(tone.into());
        self
    }

    /// Sets the token hint.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the temperature hint.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Same request with different content.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }
}

/// How the audience is likely to perceive the content, each 0-100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerceptionMetrics {
    pub clarity: f64,
    pub credibility: f64,
    pub emotional_impact: f64,
    pub call_to_action: f64,
}

/// Analysis produced by one provider, or merged by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Overall quality score, 0-100.
    pub score: f64,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    /// Rewritten content.
    pub optimization: String,
    pub hashtags: Vec<String>,
    /// Engagement predictions.
    pub engagement: Vec<String>,
    /// Named partial scores, e.g. "readability".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscores: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perception: Option<PerceptionMetrics>,
}

impl Analysis {
    /// Highest score a provider may report.
    pub const MAX_SCORE: f64 = 100.0;

    /// Returns true when the score is a finite value in `0..=100`.
    pub fn has_valid_score(&self) -> bool {
        self.score.is_finite() && (0.0..=Self::MAX_SCORE).contains(&self.score)
    }
}

/// Accounting attached to one provider call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub tokens_used: u32,
    pub cost: f64,
    pub response_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// What one provider returned.
///
/// A response with `error` set is a soft failure: it has the normal shape
/// but must not take part in consensus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Provider name, unique within a registry.
    pub provider: String,
    /// Backend model identifier.
    pub model: String,
    pub analysis: Analysis,
    pub metadata: ResponseMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProviderResponse {
    /// Returns true when the provider reported an error in-band.
    pub fn is_soft_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// A disagreement surfaced by consensus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Conflict {
    /// A provider's score is far from the mean.
    ScoreDeviation {
        provider: String,
        score: f64,
        /// Mean of all valid scores, rounded.
        consensus: f64,
    },
    /// A recommendation only one provider made.
    UniqueRecommendation {
        provider: String,
        recommendation: String,
    },
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScoreDeviation {
                provider,
                score,
                consensus,
            } => write!(
                f,
                "{} score ({}) differs significantly from consensus ({})",
                provider, score, consensus
            ),
            Self::UniqueRecommendation {
                provider,
                recommendation,
            } => write!(f, "Unique recommendation from {}: {}", provider, recommendation),
        }
    }
}

/// Totals over one consolidation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    /// Providers dispatched after the health filter.
    pub providers_attempted: usize,
    /// Providers whose response took part in consensus.
    pub providers_succeeded: usize,
    /// One `name: error` line per excluded provider.
    pub failures: Vec<String>,
    /// Tokens reported by valid responses.
    pub total_tokens: u64,
    /// Cost reported by valid responses.
    pub total_cost: f64,
}

/// Output of the consolidation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedResult {
    pub consensus: Analysis,
    /// Valid responses keyed by provider name.
    pub provider_insights: BTreeMap<String, ProviderResponse>,
    /// Agreement between providers, in [0.3, 0.8].
    pub confidence: f64,
    pub conflicts: Vec<Conflict>,
    pub usage: UsageSummary,
}

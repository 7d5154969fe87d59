//! Deterministic in-process provider.
//!
//! Used by the CLI demo and tests. Every knob a real backend can turn
//! (score, lists, health, hard or soft failure, latency) is settable, and the
//! same request always yields the same analysis.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::ProviderError;
use crate::model::{
    Analysis, AnalysisRequest, PerceptionMetrics, ProviderResponse, ResponseMetadata,
};
use crate::provider::{AnalysisProvider, ProviderKind};

/// Fixed per-request token overhead reported by the simulation.
const PROMPT_OVERHEAD_TOKENS: u32 = 200;

/// How a simulated call fails.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulatedFailure {
    /// `analyze` returns `Err`.
    Hard(String),
    /// `analyze` returns a normal response with `error` set.
    Soft(String),
    /// `analyze` panics with this message.
    Panic(String),
}

/// How the simulated health probe behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthBehavior {
    Healthy,
    Unhealthy,
    /// The probe itself errors.
    Erroring,
    /// The probe panics.
    Panicking,
}

/// Configurable fake backend.
pub struct SimulatedProvider {
    name: String,
    kind: ProviderKind,
    model: String,
    score: Option<f64>,
    insights: Vec<String>,
    recommendations: Vec<String>,
    hashtags: Vec<String>,
    engagement: Vec<String>,
    subscores: Option<BTreeMap<String, f64>>,
    perception: Option<PerceptionMetrics>,
    failure: Option<SimulatedFailure>,
    health: HealthBehavior,
    healthy_flag: AtomicBool,
    latency: Duration,
    cost_per_token: f64,
    max_tokens: u32,
    analyze_calls: AtomicUsize,
    health_probes: AtomicUsize,
}

impl SimulatedProvider {
    /// Creates a healthy provider with a content-derived score.
    pub fn new(name: impl Into<String>, kind: ProviderKind) -> Self {
        let name = name.into();
        Self {
            model: format!("{}-sim", kind),
            name,
            kind,
            score: None,
            insights: vec!["Clear opening line".to_string()],
            recommendations: vec!["Add a call to action".to_string()],
            hashtags: Vec::new(),
            engagement: vec!["Moderate engagement expected".to_string()],
            subscores: None,
            perception: None,
            failure: None,
            health: HealthBehavior::Healthy,
            healthy_flag: AtomicBool::new(true),
            latency: Duration::ZERO,
            cost_per_token: 0.000_002,
            max_tokens: 4_000,
            analyze_calls: AtomicUsize::new(0),
            health_probes: AtomicUsize::new(0),
        }
    }

    /// Pins the score instead of deriving it from the content.
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_insights<S: Into<String>>(mut self, insights: impl IntoIterator<Item = S>) -> Self {
        self.insights = insights.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_recommendations<S: Into<String>>(
        mut self,
        recommendations: impl IntoIterator<Item = S>,
    ) -> Self {
        self.recommendations = recommendations.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_hashtags<S: Into<String>>(mut self, hashtags: impl IntoIterator<Item = S>) -> Self {
        self.hashtags = hashtags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_engagement<S: Into<String>>(
        mut self,
        engagement: impl IntoIterator<Item = S>,
    ) -> Self {
        self.engagement = engagement.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_subscores<S: Into<String>>(
        mut self,
        subscores: impl IntoIterator<Item = (S, f64)>,
    ) -> Self {
        self.subscores = Some(
            subscores
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        );
        self
    }

    pub fn with_perception(mut self, perception: PerceptionMetrics) -> Self {
        self.perception = Some(perception);
        self
    }

    pub fn with_failure(mut self, failure: SimulatedFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn with_health(mut self, health: HealthBehavior) -> Self {
        self.healthy_flag
            .store(health == HealthBehavior::Healthy, Ordering::SeqCst);
        self.health = health;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_cost_per_token(mut self, cost: f64) -> Self {
        self.cost_per_token = cost;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Flips health at runtime; ignored when the probe is set to error.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy_flag.store(healthy, Ordering::SeqCst);
    }

    /// Number of `analyze` calls received.
    pub fn analyze_calls(&self) -> usize {
        self.analyze_calls.load(Ordering::SeqCst)
    }

    /// Number of health probes received.
    pub fn health_probes(&self) -> usize {
        self.health_probes.load(Ordering::SeqCst)
    }

    fn derived_score(&self, request: &AnalysisRequest) -> f64 {
        // Stable across runs: depends only on the request and the name.
        let seed = request
            .content
            .bytes()
            .chain(self.name.bytes())
            .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));
        f64::from(55 + seed % 40)
    }

    fn build_analysis(&self, request: &AnalysisRequest) -> Analysis {
        let score = self.score.unwrap_or_else(|| self.derived_score(request));
        let hashtags = if self.hashtags.is_empty() {
            vec![format!("#{}", request.platform)]
        } else {
            self.hashtags.clone()
        };

        Analysis {
            score,
            insights: self.insights.clone(),
            recommendations: self.recommendations.clone(),
            optimization: format!("[{}] {}", self.name, request.content.trim()),
            hashtags,
            engagement: self.engagement.clone(),
            subscores: self.subscores.clone(),
            perception: self.perception,
        }
    }
}

#[async_trait]
impl AnalysisProvider for SimulatedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        self.kind.clone()
    }

    async fn analyze(&self, request: &AnalysisRequest) -> Result<ProviderResponse, ProviderError> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match &self.failure {
            Some(SimulatedFailure::Hard(message)) => {
                return Err(ProviderError::Request(message.clone()));
            }
            Some(SimulatedFailure::Panic(message)) => panic!("{}", message),
            _ => {}
        }

        let tokens_used = request.content.chars().count() as u32 / 4 + PROMPT_OVERHEAD_TOKENS;
        let error = match &self.failure {
            Some(SimulatedFailure::Soft(message)) => Some(message.clone()),
            _ => None,
        };

        Ok(ProviderResponse {
            provider: self.name.clone(),
            model: self.model.clone(),
            analysis: self.build_analysis(request),
            metadata: ResponseMetadata {
                tokens_used,
                cost: f64::from(tokens_used) * self.cost_per_token,
                response_time_ms: self.latency.as_millis() as u64,
                timestamp: Utc::now(),
            },
            error,
        })
    }

    async fn is_healthy(&self) -> Result<bool, ProviderError> {
        self.health_probes.fetch_add(1, Ordering::SeqCst);
        match self.health {
            HealthBehavior::Erroring => Err(ProviderError::Request(format!(
                "{} health endpoint unreachable",
                self.name
            ))),
            HealthBehavior::Panicking => panic!("{} health check crashed", self.name),
            _ => Ok(self.healthy_flag.load(Ordering::SeqCst)),
        }
    }

    fn cost_per_token(&self) -> f64 {
        self.cost_per_token
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Platform;

    fn request() -> AnalysisRequest {
        AnalysisRequest::new("u1", Platform::Linkedin, "We are hiring two backend engineers.")
    }

    #[tokio::test]
    async fn test_deterministic_analysis() {
        let provider = SimulatedProvider::new("openai", ProviderKind::OpenAi);
        let a = provider.analyze(&request()).await.unwrap();
        let b = provider.analyze(&request()).await.unwrap();
        assert_eq!(a.analysis, b.analysis);
        assert!((55.0..95.0).contains(&a.analysis.score));
        assert_eq!(provider.analyze_calls(), 2);
    }

    #[tokio::test]
    async fn test_soft_failure_keeps_shape() {
        let provider = SimulatedProvider::new("gemini", ProviderKind::Gemini)
            .with_failure(SimulatedFailure::Soft("quota exceeded".to_string()));
        let response = provider.analyze(&request()).await.unwrap();
        assert!(response.is_soft_failure());
        assert_eq!(response.provider, "gemini");
    }

    #[tokio::test]
    async fn test_hard_failure() {
        let provider = SimulatedProvider::new("mistral", ProviderKind::Mistral)
            .with_failure(SimulatedFailure::Hard("connection reset".to_string()));
        assert!(provider.analyze(&request()).await.is_err());
    }

    #[tokio::test]
    async fn test_health_behaviors() {
        let provider = SimulatedProvider::new("a", ProviderKind::Anthropic);
        assert_eq!(provider.is_healthy().await, Ok(true));
        provider.set_healthy(false);
        assert_eq!(provider.is_healthy().await, Ok(false));

        let erroring = SimulatedProvider::new("b", ProviderKind::OpenAi)
            .with_health(HealthBehavior::Erroring);
        assert!(erroring.is_healthy().await.is_err());
        assert_eq!(erroring.health_probes(), 1);
    }
}

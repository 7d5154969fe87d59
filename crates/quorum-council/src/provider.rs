//! Provider capability and registry.
//!
//! Every backend is an opaque [`AnalysisProvider`]. Its wire format, auth and
//! retries are its own business; the engine only sees this trait.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::error::ProviderError;
use crate::model::{AnalysisRequest, ProviderResponse};

/// Backend family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Gemini,
    Mistral,
    Custom(String),
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
            Self::Gemini => write!(f, "gemini"),
            Self::Mistral => write!(f, "mistral"),
            Self::Custom(name) => write!(f, "custom:{}", name),
        }
    }
}

/// A redundant analysis backend.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Unique name within a registry.
    fn name(&self) -> &str;

    /// Backend family.
    fn kind(&self) -> ProviderKind;

    /// Runs one analysis.
    async fn analyze(&self, request: &AnalysisRequest) -> Result<ProviderResponse, ProviderError>;

    /// Cheap liveness probe.
    async fn is_healthy(&self) -> Result<bool, ProviderError>;

    /// Price of one token.
    fn cost_per_token(&self) -> f64;

    /// Largest request the backend accepts.
    fn max_tokens(&self) -> u32;
}

/// Price of one token sent to every provider in `providers`.
pub fn total_cost_per_token(providers: &[Arc<dyn AnalysisProvider>]) -> f64 {
    providers.iter().map(|p| p.cost_per_token()).sum()
}

/// Providers in registration order.
///
/// Order matters: consensus ties are broken by it.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<Vec<Arc<dyn AnalysisProvider>>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a provider, replacing one with the same name in place.
    pub fn register(&self, provider: Arc<dyn AnalysisProvider>) {
        let mut providers = self.providers.write();
        match providers.iter().position(|p| p.name() == provider.name()) {
            Some(index) => {
                info!(provider = provider.name(), "provider replaced");
                providers[index] = provider;
            }
            None => {
                info!(provider = provider.name(), kind = %provider.kind(), "provider registered");
                providers.push(provider);
            }
        }
    }

    /// Removes a provider by name. Returns it if it was registered.
    pub fn unregister(&self, name: &str) -> Option<Arc<dyn AnalysisProvider>> {
        let mut providers = self.providers.write();
        let index = providers.iter().position(|p| p.name() == name)?;
        info!(provider = name, "provider unregistered");
        Some(providers.remove(index))
    }

    /// Current providers, in registration order.
    pub fn snapshot(&self) -> Vec<Arc<dyn AnalysisProvider>> {
        self.providers.read().clone()
    }

    /// Provider names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.providers
            .read()
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }
}

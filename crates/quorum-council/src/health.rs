//! Health filter with a per-provider TTL cache.
//!
//! Probes run concurrently. A probe that errors or panics counts as unhealthy
//! for that provider only; it never fails the batch.

use dashmap::DashMap;
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::dispatch::panic_message;
use crate::provider::AnalysisProvider;

#[derive(Debug, Clone, Copy)]
struct HealthEntry {
    healthy: bool,
    checked_at: Instant,
}

/// Cached health probe results keyed by provider name.
#[derive(Debug)]
pub struct HealthCache {
    ttl: Duration,
    entries: DashMap<String, HealthEntry>,
}

impl HealthCache {
    /// Creates a cache whose entries expire after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Cached status for `name`, if still fresh.
    pub fn cached(&self, name: &str) -> Option<bool> {
        self.entries
            .get(name)
            .filter(|entry| entry.checked_at.elapsed() < self.ttl)
            .map(|entry| entry.healthy)
    }

    /// Returns the healthy subset of `providers`, in input order.
    ///
    /// Providers with a fresh cache entry are not probed again.
    pub async fn filter_healthy(
        &self,
        providers: &[Arc<dyn AnalysisProvider>],
    ) -> Vec<Arc<dyn AnalysisProvider>> {
        let mut statuses: Vec<Option<bool>> =
            providers.iter().map(|p| self.cached(p.name())).collect();

        let stale: Vec<&Arc<dyn AnalysisProvider>> = providers
            .iter()
            .zip(&statuses)
            .filter(|(_, status)| status.is_none())
            .map(|(p, _)| p)
            .collect();
        let mut probed = self.probe(&stale).await.into_iter();

        for status in statuses.iter_mut().filter(|s| s.is_none()) {
            *status = probed.next().map(|(_, healthy)| healthy);
        }

        providers
            .iter()
            .zip(statuses)
            .filter(|(_, status)| status.unwrap_or(false))
            .map(|(p, _)| Arc::clone(p))
            .collect()
    }

    /// Probes every provider regardless of cache state.
    ///
    /// Returns `(name, healthy)` in input order.
    pub async fn refresh(&self, providers: &[Arc<dyn AnalysisProvider>]) -> Vec<(String, bool)> {
        let all: Vec<&Arc<dyn AnalysisProvider>> = providers.iter().collect();
        self.probe(&all).await
    }

    /// Drops the cached status of one provider.
    pub fn invalidate(&self, name: &str) {
        self.entries.remove(name);
    }

    async fn probe(&self, providers: &[&Arc<dyn AnalysisProvider>]) -> Vec<(String, bool)> {
        if providers.is_empty() {
            return Vec::new();
        }

        let probes = providers.iter().map(|provider| async move {
            let healthy = match AssertUnwindSafe(provider.is_healthy()).catch_unwind().await {
                Ok(Ok(healthy)) => healthy,
                Ok(Err(e)) => {
                    warn!(provider = provider.name(), error = %e, "health probe failed");
                    false
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(provider = provider.name(), panic = %message, "health probe panicked");
                    false
                }
            };
            (provider.name().to_string(), healthy)
        });
        let results = join_all(probes).await;

        let now = Instant::now();
        for (name, healthy) in &results {
            debug!(provider = %name, healthy, "health probed");
            self.entries.insert(
                name.clone(),
                HealthEntry {
                    healthy: *healthy,
                    checked_at: now,
                },
            );
        }
        results
    }
}

impl Default for HealthCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderKind;
    use crate::simulated::{HealthBehavior, SimulatedProvider};

    #[tokio::test]
    async fn test_erroring_probe_counts_as_unhealthy() {
        let good = Arc::new(SimulatedProvider::new("good", ProviderKind::OpenAi));
        let broken = Arc::new(
            SimulatedProvider::new("broken", ProviderKind::Gemini)
                .with_health(HealthBehavior::Erroring),
        );
        let providers: Vec<Arc<dyn AnalysisProvider>> = vec![good, broken];

        let cache = HealthCache::default();
        let healthy = cache.filter_healthy(&providers).await;
        assert_eq!(healthy.len(), 1);
        assert_eq!(healthy[0].name(), "good");
        assert_eq!(cache.cached("broken"), Some(false));
    }

    #[tokio::test]
    async fn test_panicking_health_check_counts_as_unhealthy() {
        let good = Arc::new(SimulatedProvider::new("good", ProviderKind::OpenAi));
        let crashing = Arc::new(
            SimulatedProvider::new("crashing", ProviderKind::Mistral)
                .with_health(HealthBehavior::Panicking),
        );
        let providers: Vec<Arc<dyn AnalysisProvider>> = vec![crashing, good];

        let cache = HealthCache::default();
        let statuses = cache.refresh(&providers).await;
        assert_eq!(
            statuses,
            vec![("crashing".to_string(), false), ("good".to_string(), true)]
        );
        assert_eq!(cache.cached("crashing"), Some(false));
    }

    #[tokio::test]
    async fn test_fresh_entries_are_not_reprobed() {
        let provider = Arc::new(SimulatedProvider::new("a", ProviderKind::Anthropic));
        let providers: Vec<Arc<dyn AnalysisProvider>> = vec![provider.clone()];

        let cache = HealthCache::new(Duration::from_secs(60));
        cache.filter_healthy(&providers).await;
        cache.filter_healthy(&providers).await;
        assert_eq!(provider.health_probes(), 1);

        cache.refresh(&providers).await;
        assert_eq!(provider.health_probes(), 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_always_probes() {
        let provider = Arc::new(SimulatedProvider::new("a", ProviderKind::Mistral));
        let providers: Vec<Arc<dyn AnalysisProvider>> = vec![provider.clone()];

        let cache = HealthCache::new(Duration::ZERO);
        provider.set_healthy(false);
        assert!(cache.filter_healthy(&providers).await.is_empty());
        provider.set_healthy(true);
        assert_eq!(cache.filter_healthy(&providers).await.len(), 1);
        assert_eq!(provider.health_probes(), 2);
    }
}
